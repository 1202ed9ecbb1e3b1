//! Localized UI strings and result messages.
//!
//! Each language pack holds its result strings in a fixed-size array aligned
//! with [`Denomination::ALL`], so a pack with a missing or extra entry does not
//! compile.

use std::collections::HashMap;

use serde::Serialize;

use crate::denomination::{CanonicalLabel, Denomination, DENOMINATION_COUNT};
use crate::error::FaultKind;
use crate::language::Language;

/// Every string the reader shows or speaks in one language.
#[derive(Debug, Clone, Serialize)]
pub struct LanguagePack {
    pub title: String,
    pub description: String,
    pub upload: String,
    pub camera: String,
    pub capture: String,
    pub detecting: String,
    pub back: String,
    /// Generic "not a valid currency image" message; also used for
    /// `Unrecognized` and for faults without a dedicated string.
    pub error: String,
    /// One entry per denomination, in master order.
    pub results: [String; DENOMINATION_COUNT],
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub faults: HashMap<FaultKind, String>,
}

impl LanguagePack {
    pub fn result(&self, denomination: Denomination) -> &str {
        &self.results[denomination.index()]
    }
}

/// Lookup table for all supported languages.
#[derive(Debug, Clone)]
pub struct Catalog {
    en: LanguagePack,
    yo: LanguagePack,
    ig: LanguagePack,
    ha: LanguagePack,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Catalog {
    /// The strings shipped with the reader.
    pub fn builtin() -> Self {
        Self {
            en: english(),
            yo: yoruba(),
            ig: igbo(),
            ha: hausa(),
        }
    }

    pub fn strings(&self, language: Language) -> &LanguagePack {
        match language {
            Language::En => &self.en,
            Language::Yo => &self.yo,
            Language::Ig => &self.ig,
            Language::Ha => &self.ha,
        }
    }

    /// Message for a classification outcome.
    pub fn result_message(&self, label: CanonicalLabel, language: Language) -> &str {
        let pack = self.strings(language);
        match label {
            CanonicalLabel::Note(d) => pack.result(d),
            CanonicalLabel::Unrecognized => &pack.error,
        }
    }

    /// Message for a fault.
    pub fn fault_message(&self, fault: FaultKind, language: Language) -> &str {
        let pack = self.strings(language);
        match pack.faults.get(&fault) {
            Some(msg) => msg,
            None if fault == FaultKind::Busy => &pack.detecting,
            None => &pack.error,
        }
    }
}

fn results(suffix: &str) -> [String; DENOMINATION_COUNT] {
    Denomination::ALL.map(|d| format!("{d} - {suffix}"))
}

fn english() -> LanguagePack {
    let faults = HashMap::from([
        (FaultKind::InvalidFile, "Please choose an image file.".to_string()),
        (
            FaultKind::FileTooLarge,
            "The image is too large. Please use a file under 10 MB.".to_string(),
        ),
        (FaultKind::CameraUnavailable, "The camera could not be started.".to_string()),
        (
            FaultKind::ServiceError,
            "Could not identify the currency right now. Please try again.".to_string(),
        ),
        (FaultKind::UnsupportedLanguage, "That language is not supported.".to_string()),
        (FaultKind::Busy, "Please wait, still detecting currency.".to_string()),
    ]);
    LanguagePack {
        title: "PayGuide".into(),
        description: "Helping visually impaired users recognize currency.".into(),
        upload: "Upload Currency Image".into(),
        camera: "Use Live Camera".into(),
        capture: "Capture Image".into(),
        detecting: "Detecting currency...".into(),
        back: "Back".into(),
        error: "Invalid currency image.".into(),
        results: results("Nigerian Naira"),
        faults,
    }
}

fn yoruba() -> LanguagePack {
    LanguagePack {
        title: "Itọsọna Òwò".into(),
        description: "Ṣe iranlọwọ fun awọn ẹni aláìríran lati mọ owo ní rọọrun.".into(),
        upload: "Ṣe igbasilẹ aworan Owo".into(),
        camera: "Lo Kamẹra Taayọ".into(),
        capture: "Ya Aworan".into(),
        detecting: "Ìdánwò owó...".into(),
        back: "Pada".into(),
        error: "Aworan owó kò tọ. Jọwọ rii daju pé o jẹ owó Naijiria.".into(),
        results: results("Naira Naijiria"),
        faults: HashMap::new(),
    }
}

fn igbo() -> LanguagePack {
    LanguagePack {
        title: "Ntuzi Ego".into(),
        description: "Inye aka nye ndi na-anaghị ahụ anya ka ha mata ego n’efu.".into(),
        upload: "Bulite Onyinyo Ego".into(),
        camera: "Jiri Kamera".into(),
        capture: "Nweta Onyinyo".into(),
        detecting: "Na achọpụta ego...".into(),
        back: "Laghachi".into(),
        error: "Onyinyo ego ezighi ezi. Biko hụ na ọ bụ ego Naijiria.".into(),
        results: results("Naira Naijiria"),
        faults: HashMap::new(),
    }
}

fn hausa() -> LanguagePack {
    LanguagePack {
        title: "Jagoran Kuɗi".into(),
        description: "Taimakawa masu rashin gani su gane kuɗi cikin sauƙi.".into(),
        upload: "Loda Hoton Kuɗi".into(),
        camera: "Yi Amfani da Kamara".into(),
        capture: "Dauki Hoto".into(),
        detecting: "Ana tantance kuɗi...".into(),
        back: "Koma Baya".into(),
        error: "Hoton kuɗi ba daidai bane. Tabbatar cewa kuɗin Najeriya ne.".into(),
        results: results("Naira Najeriya"),
        faults: HashMap::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_note_has_a_message_in_every_language() {
        let catalog = Catalog::builtin();
        for lang in Language::ALL {
            for d in Denomination::ALL {
                let msg = catalog.result_message(CanonicalLabel::Note(d), lang);
                assert!(!msg.is_empty());
                assert!(msg.starts_with(&format!("₦{} ", d.value())), "{lang}: {msg}");
                assert_eq!(msg, catalog.result_message(CanonicalLabel::Note(d), lang));
            }
        }
    }

    #[test]
    fn messages_are_language_specific() {
        let catalog = Catalog::builtin();
        let note = CanonicalLabel::Note(Denomination::N1000);
        assert_eq!(catalog.result_message(note, Language::En), "₦1000 - Nigerian Naira");
        assert_eq!(catalog.result_message(note, Language::Yo), "₦1000 - Naira Naijiria");
        assert_eq!(catalog.result_message(note, Language::Ig), "₦1000 - Naira Naijiria");
        assert_eq!(catalog.result_message(note, Language::Ha), "₦1000 - Naira Najeriya");
    }

    #[test]
    fn results_follow_master_order() {
        let pack = Catalog::builtin().strings(Language::En).clone();
        assert_eq!(pack.results[0], "₦1000 - Nigerian Naira");
        assert_eq!(pack.results[4], "₦50 - Nigerian Naira");
        assert_eq!(pack.results[7], "₦5 - Nigerian Naira");
    }

    #[test]
    fn unrecognized_uses_generic_error() {
        let catalog = Catalog::builtin();
        for lang in Language::ALL {
            assert_eq!(
                catalog.result_message(CanonicalLabel::Unrecognized, lang),
                catalog.strings(lang).error
            );
        }
    }

    #[test]
    fn faults_fall_back_to_generic_error() {
        let catalog = Catalog::builtin();
        assert_eq!(
            catalog.fault_message(FaultKind::ServiceError, Language::En),
            "Could not identify the currency right now. Please try again."
        );
        assert_eq!(
            catalog.fault_message(FaultKind::ServiceError, Language::Ha),
            catalog.strings(Language::Ha).error
        );
        assert_eq!(
            catalog.fault_message(FaultKind::Busy, Language::Yo),
            catalog.strings(Language::Yo).detecting
        );
    }
}
