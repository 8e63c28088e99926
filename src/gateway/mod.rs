//! Boundary to the text and vision completion service.

mod openai;

pub use openai::OpenAiGateway;

use crate::error::ProviderError;

/// Most images sent with one vision request, whatever the caller supplies.
pub const MAX_VISION_IMAGES: usize = 3;

/// A blocking completion service.
pub trait CompletionGateway {
    fn name(&self) -> &'static str;

    /// Completes `prompt`, optionally under the given system instructions.
    fn complete_text(&self, prompt: &str, instructions: Option<&str>) -> Result<String, ProviderError>;

    /// Completes `prompt` about `images`. Implementations send at most
    /// [`MAX_VISION_IMAGES`] of them.
    fn complete_vision(&self, prompt: &str, images: &[Vec<u8>]) -> Result<String, ProviderError>;
}

impl<G: CompletionGateway + ?Sized> CompletionGateway for Box<G> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn complete_text(&self, prompt: &str, instructions: Option<&str>) -> Result<String, ProviderError> {
        (**self).complete_text(prompt, instructions)
    }

    fn complete_vision(&self, prompt: &str, images: &[Vec<u8>]) -> Result<String, ProviderError> {
        (**self).complete_vision(prompt, images)
    }
}

pub fn cap_images(images: &[Vec<u8>]) -> &[Vec<u8>] {
    if images.len() > MAX_VISION_IMAGES {
        tracing::debug!(
            supplied = images.len(),
            kept = MAX_VISION_IMAGES,
            "capping vision request images"
        );
        &images[..MAX_VISION_IMAGES]
    } else {
        images
    }
}

/// Drops markup fences and any trailing `[Debug: ...]` section a reply carries.
pub fn clean_reply(raw: &str) -> String {
    let body = match raw.rfind("[Debug:") {
        Some(at) => &raw[..at],
        None => raw,
    };
    body.replace("```html", "")
        .replace("```mermaid", "")
        .replace("```", "")
        .trim()
        .to_string()
}
