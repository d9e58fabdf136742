/// Masonry column placement
///
/// Greedy shortest-column packing: each image goes to the currently
/// shortest column, with ties broken by the lowest column index. The
/// height estimate is `100 / columns / aspect`, which approximates the
/// rendered height of an image whose width is one column of a
/// 100%-wide grid -- good enough for balanced columns without a layout
/// measurement round-trip.
///
/// The layout is a pure function of the image sequence and the column
/// count; callers recompute it whenever either changes (viewport
/// resize, new page, deletion).

use crate::api::types::GalleryImage;

/// Width of the whole grid in the height-estimate unit system.
const GRID_UNITS: f32 = 100.0;

/// Column count per viewport width, matching the layout breakpoints.
pub fn column_count(viewport_width: f32) -> usize {
    if viewport_width < 768.0 {
        1
    } else if viewport_width < 1024.0 {
        2
    } else if viewport_width < 1280.0 {
        3
    } else if viewport_width < 1536.0 {
        4
    } else {
        5
    }
}

/// Distribute `images` over `columns` ordered stacks.
///
/// Order is preserved within each column but not globally across
/// columns. Every image lands in exactly one column.
pub fn layout<'a>(images: &[&'a GalleryImage], columns: usize) -> Vec<Vec<&'a GalleryImage>> {
    if columns == 0 {
        return Vec::new();
    }

    let mut stacks: Vec<Vec<&GalleryImage>> = vec![Vec::new(); columns];
    let mut heights = vec![0.0_f32; columns];

    for image in images {
        // First strict minimum wins, so equal heights resolve to the
        // lowest index.
        let mut shortest = 0;
        for (index, height) in heights.iter().enumerate() {
            if *height < heights[shortest] {
                shortest = index;
            }
        }

        stacks[shortest].push(image);
        heights[shortest] += GRID_UNITS / columns as f32 / image.aspect_ratio();
    }

    stacks
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn image(id: &str, width: u32, height: u32) -> GalleryImage {
        GalleryImage {
            id: id.to_string(),
            title: None,
            description: None,
            tags: Vec::new(),
            format: "jpeg".into(),
            width,
            height,
            url: format!("https://cdn.example.com/{id}.jpg"),
            thumbnail_url: None,
            uploaded_at: Utc::now(),
        }
    }

    fn ids<'a>(stack: &'a [&'a GalleryImage]) -> Vec<&'a str> {
        stack.iter().map(|i| i.id.as_str()).collect()
    }

    #[test]
    fn breakpoints_match_viewport_widths() {
        assert_eq!(column_count(320.0), 1);
        assert_eq!(column_count(767.9), 1);
        assert_eq!(column_count(768.0), 2);
        assert_eq!(column_count(1023.9), 2);
        assert_eq!(column_count(1024.0), 3);
        assert_eq!(column_count(1280.0), 4);
        assert_eq!(column_count(1536.0), 5);
        assert_eq!(column_count(2560.0), 5);
    }

    #[test]
    fn every_image_lands_in_exactly_one_column() {
        let images: Vec<GalleryImage> = (0..17)
            .map(|n| image(&format!("img{n}"), 400 + n * 13, 300))
            .collect();
        let refs: Vec<&GalleryImage> = images.iter().collect();

        let stacks = layout(&refs, 3);
        assert_eq!(stacks.len(), 3);
        let placed: usize = stacks.iter().map(Vec::len).sum();
        assert_eq!(placed, 17);

        // No image appears twice.
        let mut seen: Vec<&str> = stacks.iter().flat_map(|s| ids(s)).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), 17);
    }

    #[test]
    fn shortest_column_wins_each_step() {
        // Aspects 1:1, 2:1, 1:1 over two columns.
        // a (aspect 1) -> heights (0,0), tie, col 0; col 0 grows by 50.
        // b (aspect 2) -> col 1 is shortest; grows by 25.
        // c (aspect 1) -> col 1 (25) still below col 0 (50); col 1.
        let a = image("a", 100, 100);
        let b = image("b", 200, 100);
        let c = image("c", 100, 100);
        let refs = vec![&a, &b, &c];

        let stacks = layout(&refs, 2);
        assert_eq!(ids(&stacks[0]), vec!["a"]);
        assert_eq!(ids(&stacks[1]), vec!["b", "c"]);
    }

    #[test]
    fn ties_resolve_to_the_lowest_index() {
        // Equal squares over three columns fill columns left to right,
        // then wrap back to column 0.
        let images: Vec<GalleryImage> = (0..4).map(|n| image(&format!("s{n}"), 100, 100)).collect();
        let refs: Vec<&GalleryImage> = images.iter().collect();

        let stacks = layout(&refs, 3);
        assert_eq!(ids(&stacks[0]), vec!["s0", "s3"]);
        assert_eq!(ids(&stacks[1]), vec!["s1"]);
        assert_eq!(ids(&stacks[2]), vec!["s2"]);
    }

    #[test]
    fn tall_images_push_later_ones_elsewhere() {
        // d is very tall (aspect 1/4 -> adds 200 to its column); the
        // following squares avoid that column until the others catch up.
        let d = image("d", 100, 400);
        let e = image("e", 100, 100);
        let f = image("f", 100, 100);
        let g = image("g", 100, 100);
        let refs = vec![&d, &e, &f, &g];

        let stacks = layout(&refs, 2);
        // d -> col 0 (height 200). e -> col 1 (50). f -> col 1 (100).
        // g -> col 1 (150).
        assert_eq!(ids(&stacks[0]), vec!["d"]);
        assert_eq!(ids(&stacks[1]), vec!["e", "f", "g"]);
    }

    #[test]
    fn zero_height_uses_square_fallback() {
        let broken = image("z", 800, 0);
        let refs = vec![&broken];
        let stacks = layout(&refs, 2);
        assert_eq!(ids(&stacks[0]), vec!["z"]);
    }

    #[test]
    fn zero_columns_yields_no_stacks() {
        let a = image("a", 100, 100);
        let refs = vec![&a];
        assert!(layout(&refs, 0).is_empty());
    }

    #[test]
    fn single_column_preserves_order() {
        let images: Vec<GalleryImage> = (0..5).map(|n| image(&format!("o{n}"), 300, 200 + n * 40)).collect();
        let refs: Vec<&GalleryImage> = images.iter().collect();

        let stacks = layout(&refs, 1);
        assert_eq!(ids(&stacks[0]), vec!["o0", "o1", "o2", "o3", "o4"]);
    }
}
