/*!
 * Translation of subtitle batches.
 *
 * - `batch`: splitting the cue range into fixed-size batches
 * - `prompts`: prompt text and response parsing
 * - `core`: the retrying translation service
 * - `materializer`: merging results into the collection and writing the output
 */

// Re-export main types for easier usage
pub use self::batch::{Batch, BatchPlan};
pub use self::core::{TimeoutClass, TranslationService};
pub use self::materializer::OutputMaterializer;

// Submodules
pub mod batch;
pub mod core;
pub mod materializer;
pub mod prompts;
