//! Interest filter over the working set

use std::borrow::Cow;

use crate::schema::ImageRecord;

/// Restrict `images` to notable captures when `interesting_only` is set
///
/// With the flag off the input slice is returned as is.
pub fn filter_interesting(images: &[ImageRecord], interesting_only: bool) -> Cow<'_, [ImageRecord]> {
    if !interesting_only {
        return Cow::Borrowed(images);
    }

    Cow::Owned(
        images
            .iter()
            .filter(|image| image.is_interesting())
            .cloned()
            .collect(),
    )
}
