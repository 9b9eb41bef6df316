mod facet;
mod ids;
mod record;
mod scope;

pub use facet::{Accent, DefinitionType, Facet};
pub use ids::{DefinitionId, WordId};
pub use record::{
    AuthoritativeEntry, BasicDefinition, BilingualEntry, Definitions, EnglishDefinition,
    EnglishEntry, ExamplePair, Idiom, Pronunciation, Pronunciations, Sentence, SenseDefinition,
    WebDefinition, WordForm, WordRecord, normalize_word,
};
pub use scope::DefinitionScope;
