//! Out-of-core collaborators (spec §6.3–§6.4, C5/C6): the screenshot-OCR
//! parser client, the user-profile facade, and the background image
//! dimension fetcher that replaces Mode B's placeholder geometry.

pub mod dimensions;
pub mod geometry;
pub mod profile;
pub mod screenshot;

pub use dimensions::{DimensionFetcher, ImageDimensions};
pub use geometry::{normalize_bbox, NormalizedBbox};
pub use profile::{StubProfileFacade, UserProfile, UserProfileFacade};
pub use screenshot::{Bbox, Bubble, ScreenshotClient};
