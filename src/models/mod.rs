pub mod case_script;
pub mod debrief;
pub mod loaders;
pub mod markers;
pub mod order;
pub mod part;
pub mod specialty;
pub mod transcript;

pub use case_script::CaseScript;
pub use debrief::TrustedHtml;
pub use loaders::{load_case_library, load_case_script};
pub use order::{OrderCategory, OrderKey, SubmittedOrders};
pub use part::{InlineData, Part, Phase, RawPart};
pub use specialty::{suggest_diagnoses, Specialty};
pub use transcript::{transcript_text, TranscriptEntry};
