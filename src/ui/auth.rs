use iced::widget::{button, column, container, text, text_input, Column};
use iced::{Alignment, Element, Length};

use crate::api::auth::Session;
use crate::error::Error;

/// Shared state of the sign-in and sign-up forms.
#[derive(Debug, Default)]
pub struct AuthForm {
    pub email: String,
    pub password: String,
    pub error: Option<String>,
    pub submitting: bool,
}

impl AuthForm {
    /// Clear transient state when switching between sign-in/sign-up.
    pub fn reset(&mut self) {
        self.password.clear();
        self.error = None;
        self.submitting = false;
    }

    /// Client-side checks before any network call: an email-shaped
    /// address and a password of 8..=64 characters.
    pub fn validate(&self) -> Result<(), String> {
        let email = self.email.trim();
        if !email.contains('@') || !email.contains('.') || email.len() < 5 {
            return Err("Please enter a valid email address.".into());
        }
        if self.password.chars().count() < 8 {
            return Err("Please enter at least 8 characters.".into());
        }
        if self.password.chars().count() > 64 {
            return Err("Please enter fewer than 64 characters.".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub enum AuthMessage {
    EmailChanged(String),
    PasswordChanged(String),
    Submit,
    SignedIn(Result<Session, Error>),
    SignedUp(Result<(), Error>),
    GoToSignUp,
    GoToSignIn,
}

pub fn sign_in(form: &AuthForm) -> Element<'_, AuthMessage> {
    screen(
        "Sign in",
        form,
        if form.submitting { "Loading..." } else { "Sign in" },
        button("Create an account")
            .style(button::text)
            .on_press(AuthMessage::GoToSignUp),
    )
}

pub fn sign_up(form: &AuthForm) -> Element<'_, AuthMessage> {
    screen(
        "Sign up",
        form,
        if form.submitting { "Loading..." } else { "Sign up" },
        button("I already have an account")
            .style(button::text)
            .on_press(AuthMessage::GoToSignIn),
    )
}

/// Shown after a successful sign-up; the provider has sent a
/// confirmation email.
pub fn check_email() -> Element<'static, AuthMessage> {
    let content: Column<AuthMessage> = column![
        text("Check your email").size(32),
        text("We sent you a confirmation link. Follow it, then sign in.").size(16),
        button("Back to sign in").on_press(AuthMessage::GoToSignIn),
    ]
    .spacing(20)
    .align_x(Alignment::Center);

    centered(content.into())
}

fn screen<'a>(
    title: &'a str,
    form: &'a AuthForm,
    submit_label: &'a str,
    switch: iced::widget::Button<'a, AuthMessage>,
) -> Element<'a, AuthMessage> {
    let mut fields = column![
        text(title).size(32),
        text_input("Email", &form.email)
            .on_input(AuthMessage::EmailChanged)
            .padding(10)
            .width(320),
        text_input("Password", &form.password)
            .on_input(AuthMessage::PasswordChanged)
            .on_submit(AuthMessage::Submit)
            .secure(true)
            .padding(10)
            .width(320),
    ]
    .spacing(16)
    .align_x(Alignment::Center);

    if let Some(message) = &form.error {
        fields = fields.push(text(message).size(14).style(text::danger));
    }

    let submit = button(text(submit_label))
        .padding(10)
        .width(320)
        .on_press_maybe((!form.submitting).then_some(AuthMessage::Submit));

    let content = fields.push(submit).push(switch);
    centered(content.into())
}

fn centered(content: Element<'_, AuthMessage>) -> Element<'_, AuthMessage> {
    container(content)
        .width(Length::Fill)
        .height(Length::Fill)
        .center_x(Length::Fill)
        .center_y(Length::Fill)
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(email: &str, password: &str) -> AuthForm {
        AuthForm {
            email: email.into(),
            password: password.into(),
            ..AuthForm::default()
        }
    }

    #[test]
    fn rejects_malformed_emails() {
        assert!(form("not-an-email", "longenough").validate().is_err());
        assert!(form("a@b", "longenough").validate().is_err());
        assert!(form("user@example.com", "longenough").validate().is_ok());
    }

    #[test]
    fn enforces_password_length_bounds() {
        assert!(form("user@example.com", "short").validate().is_err());
        assert!(form("user@example.com", &"x".repeat(65)).validate().is_err());
        assert!(form("user@example.com", &"x".repeat(64)).validate().is_ok());
        assert!(form("user@example.com", &"x".repeat(8)).validate().is_ok());
    }

    #[test]
    fn reset_keeps_the_email() {
        let mut f = form("user@example.com", "password1");
        f.error = Some("bad".into());
        f.submitting = true;

        f.reset();
        assert_eq!(f.email, "user@example.com");
        assert!(f.password.is_empty());
        assert!(f.error.is_none());
        assert!(!f.submitting);
    }
}
