//! Machine Translation Module
//!
//! DeepL 호환 백엔드와 테스트용 mock 번역기

pub mod deepl;
pub mod mock;
pub mod translator;

pub use deepl::{DeeplTranslator, DEFAULT_DEEPL_API_URL};
pub use mock::{MockMode, MockTranslator};
pub use translator::{normalize_lang, MachineTranslator, MtError};
