pub mod canonical;
pub mod country;
pub mod eligibility;
pub mod extractor;
pub mod lexicon;
pub mod record;
pub mod text;

mod error;

pub use canonical::{EntityKey, EntityType};
pub use eligibility::{
	Dimension, FilterOutcome, PatientProfile, PatientQuery, Sex, Verdict, Verdicts,
};
pub use error::{Error, Result};
pub use extractor::{
	EntityExtractor, Evidence, ExtractedEntity, ExtractedRelation, Extraction, LexiconRecognizer,
	Recognizer, RelationKind, Span,
};
pub use record::{FieldValue, Record, Source, fields};
