//! Region-aware translation registry.
//!
//! Three tables drive message localization:
//! - location substring → [`RegionCode`]
//! - [`RegionCode`] → ordered [`Language`] list, always ending in English
//! - `(language, message_key)` → template string
//!
//! All three are static data built once; lookups never branch per language.

use crate::types::Severity;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Delimiter between per-language renderings of the same field.
pub const LANGUAGE_DELIMITER: &str = " | ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    English,
    Hindi,
    Bengali,
    Odia,
    Gujarati,
    Marathi,
    Kannada,
    Telugu,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::Hindi => "hi",
            Language::Bengali => "bn",
            Language::Odia => "or",
            Language::Gujarati => "gu",
            Language::Marathi => "mr",
            Language::Kannada => "kn",
            Language::Telugu => "te",
        }
    }

    pub const ALL: [Language; 8] = [
        Language::English,
        Language::Hindi,
        Language::Bengali,
        Language::Odia,
        Language::Gujarati,
        Language::Marathi,
        Language::Kannada,
        Language::Telugu,
    ];
}

/// The language every region list terminates in.
pub const UNIVERSAL_LANGUAGE: Language = Language::English;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionCode {
    Jharkhand,
    Odisha,
    Chhattisgarh,
    WestBengal,
    Rajasthan,
    Gujarat,
    Maharashtra,
    Karnataka,
    Telangana,
    AndhraPradesh,
    MadhyaPradesh,
    Default,
}

/// Lowercase substrings matched against a facility's location text.
const REGION_PATTERNS: &[(&str, RegionCode)] = &[
    ("jharkhand", RegionCode::Jharkhand),
    ("odisha", RegionCode::Odisha),
    ("chhattisgarh", RegionCode::Chhattisgarh),
    ("west bengal", RegionCode::WestBengal),
    ("rajasthan", RegionCode::Rajasthan),
    ("gujarat", RegionCode::Gujarat),
    ("maharashtra", RegionCode::Maharashtra),
    ("karnataka", RegionCode::Karnataka),
    ("telangana", RegionCode::Telangana),
    ("andhra pradesh", RegionCode::AndhraPradesh),
    ("madhya pradesh", RegionCode::MadhyaPradesh),
];

use Language::{Bengali, English, Gujarati, Hindi, Kannada, Marathi, Odia, Telugu};

const REGION_LANGUAGES: &[(RegionCode, &[Language])] = &[
    (RegionCode::Jharkhand, &[Hindi, English]),
    (RegionCode::Odisha, &[Odia, Hindi, English]),
    (RegionCode::Chhattisgarh, &[Hindi, English]),
    (RegionCode::WestBengal, &[Bengali, Hindi, English]),
    (RegionCode::Rajasthan, &[Hindi, English]),
    (RegionCode::Gujarat, &[Gujarati, Hindi, English]),
    (RegionCode::Maharashtra, &[Marathi, Hindi, English]),
    (RegionCode::Karnataka, &[Kannada, Hindi, English]),
    (RegionCode::Telangana, &[Telugu, Hindi, English]),
    (RegionCode::AndhraPradesh, &[Telugu, Hindi, English]),
    (RegionCode::MadhyaPradesh, &[Hindi, English]),
    (RegionCode::Default, DEFAULT_LANGUAGES),
];

/// Two-entry fallback for unmatched regions.
pub const DEFAULT_LANGUAGES: &[Language] = &[Hindi, English];

/// Case-insensitive substring match of a free-text location against the
/// region table. The first matching entry wins.
pub fn region_for(location: &str) -> RegionCode {
    let lower = location.to_lowercase();
    REGION_PATTERNS
        .iter()
        .find(|(pattern, _)| lower.contains(pattern))
        .map(|(_, code)| *code)
        .unwrap_or(RegionCode::Default)
}

pub fn languages_for(region: RegionCode) -> &'static [Language] {
    REGION_LANGUAGES
        .iter()
        .find(|(code, _)| *code == region)
        .map(|(_, langs)| *langs)
        .unwrap_or(DEFAULT_LANGUAGES)
}

/// Keys every language must carry; the short-form SMS is assembled from these.
pub const REQUIRED_KEYS: &[&str] = &[
    "sms.header",
    "label.facility",
    "label.risk",
    "label.time",
    "label.score",
    "system.name",
    "severity.HIGH",
    "severity.MEDIUM",
    "severity.LOW",
    "action.HIGH",
    "action.MEDIUM",
    "action.LOW",
];

pub fn severity_key(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "severity.HIGH",
        Severity::Medium => "severity.MEDIUM",
        Severity::Low => "severity.LOW",
    }
}

pub fn action_key(severity: Severity) -> &'static str {
    match severity {
        Severity::High => "action.HIGH",
        Severity::Medium => "action.MEDIUM",
        Severity::Low => "action.LOW",
    }
}

/// Ordered recommended-action bullet keys for the email body.
pub fn email_action_keys(severity: Severity) -> &'static [&'static str] {
    match severity {
        Severity::High => &[
            "email.action.evacuate",
            "email.action.stop_operations",
            "email.action.deploy_response",
            "email.action.activate_comms",
            "email.action.contact_authorities",
            "email.action.increase_sensors",
        ],
        Severity::Medium => &[
            "email.action.restrict_access",
            "email.action.increase_monitoring",
            "email.action.review_protocols",
            "email.action.brief_personnel",
            "email.action.prepare_evacuation",
        ],
        Severity::Low => &[
            "email.action.continue_operations",
            "email.action.maintain_schedule",
            "email.action.watch_changes",
        ],
    }
}

/// Central translation registry.
pub struct Translations {
    map: HashMap<(&'static str, &'static str), &'static str>,
}

impl Translations {
    /// Exact lookup without fallback.
    pub fn get_template(&self, lang: &str, key: &str) -> Option<&'static str> {
        self.map.get(&(lang, key)).copied()
    }

    /// Renders `key` in each language (in order) and joins with
    /// [`LANGUAGE_DELIMITER`]. Languages lacking the key are skipped.
    ///
    /// # Examples
    ///
    /// ```
    /// use rockwatch_common::i18n::{TRANSLATIONS, Language};
    ///
    /// let s = TRANSLATIONS.localized("label.risk", &[Language::Hindi, Language::English]);
    /// assert_eq!(s, "जोखिम | Risk");
    /// ```
    pub fn localized(&self, key: &str, languages: &[Language]) -> String {
        languages
            .iter()
            .filter_map(|lang| self.get_template(lang.code(), key))
            .collect::<Vec<_>>()
            .join(LANGUAGE_DELIMITER)
    }
}

/// Global translation singleton.
pub static TRANSLATIONS: LazyLock<Translations> = LazyLock::new(|| {
    let mut map = HashMap::new();

    macro_rules! t {
        ($lang:expr, $key:expr, $val:expr) => {
            map.insert(($lang, $key), $val);
        };
    }

    // ---- English ----
    t!("en", "sms.header", "ROCKFALL ALERT");
    t!("en", "label.facility", "Mine");
    t!("en", "label.risk", "Risk");
    t!("en", "label.time", "Time");
    t!("en", "label.score", "Score");
    t!("en", "system.name", "AI Rockfall System");
    t!("en", "severity.HIGH", "HIGH RISK");
    t!("en", "severity.MEDIUM", "MEDIUM RISK");
    t!("en", "severity.LOW", "LOW RISK");
    t!("en", "action.HIGH", "EVACUATE NOW! Stop operations!");
    t!("en", "action.MEDIUM", "Restrict access. Increase monitoring.");
    t!("en", "action.LOW", "Continue with caution. Monitor closely.");

    // ---- Hindi ----
    t!("hi", "sms.header", "शिलाखंड अलर्ट");
    t!("hi", "label.facility", "खान");
    t!("hi", "label.risk", "जोखिम");
    t!("hi", "label.time", "समय");
    t!("hi", "label.score", "स्कोर");
    t!("hi", "system.name", "AI शिलाखंड सिस्टम");
    t!("hi", "severity.HIGH", "उच्च जोखिम");
    t!("hi", "severity.MEDIUM", "मध्यम जोखिम");
    t!("hi", "severity.LOW", "निम्न जोखिम");
    t!("hi", "action.HIGH", "तुरंत निकासी करें! ऑपरेशन बंद करें!");
    t!("hi", "action.MEDIUM", "प्रवेश प्रतिबंधित करें। निगरानी बढ़ाएं।");
    t!("hi", "action.LOW", "सावधानी बरतें। निगरानी जारी रखें।");

    // ---- Bengali ----
    t!("bn", "sms.header", "শিলাপতন সতর্কতা");
    t!("bn", "label.facility", "খনি");
    t!("bn", "label.risk", "ঝুঁকি");
    t!("bn", "label.time", "সময়");
    t!("bn", "label.score", "স্কোর");
    t!("bn", "system.name", "AI শিলাপতন সিস্টেম");
    t!("bn", "severity.HIGH", "উচ্চ ঝুঁকি");
    t!("bn", "severity.MEDIUM", "মধ্যম ঝুঁকি");
    t!("bn", "severity.LOW", "কম ঝুঁকি");
    t!("bn", "action.HIGH", "এখনই সরে যান! কাজ বন্ধ করুন!");
    t!("bn", "action.MEDIUM", "প্রবেশ সীমিত করুন। নিরীক্ষণ বাড়ান।");
    t!("bn", "action.LOW", "সতর্ক থাকুন। নিরীক্ষণ চালিয়ে যান।");

    // ---- Odia ----
    t!("or", "sms.header", "ପଥର ଖସିବା ଚେତାବନୀ");
    t!("or", "label.facility", "ଖଣି");
    t!("or", "label.risk", "ବିପଦ");
    t!("or", "label.time", "ସମୟ");
    t!("or", "label.score", "ସ୍କୋର");
    t!("or", "system.name", "AI ପଥର ଖସିବା ସିଷ୍ଟମ");
    t!("or", "severity.HIGH", "ଅଧିକ ବିପଦ");
    t!("or", "severity.MEDIUM", "ମଧ୍ୟମ ବିପଦ");
    t!("or", "severity.LOW", "କମ ବିପଦ");
    t!("or", "action.HIGH", "ତତକ୍ଷଣାତ ବାହାରିଯାଆନ୍ତୁ! କାମ ବନ୍ଦ କରନ୍ତୁ!");
    t!("or", "action.MEDIUM", "ପ୍ରବେଶ ସୀମିତ କରନ୍ତୁ। ନିରୀକ୍ଷଣ ବଢ଼ାନ୍ତୁ।");
    t!("or", "action.LOW", "ସତର୍କ ରୁହନ୍ତୁ। ନିରୀକ୍ଷଣ ଜାରି ରଖନ୍ତୁ।");

    // ---- Gujarati ----
    t!("gu", "sms.header", "ખડક પતન ચેતવણી");
    t!("gu", "label.facility", "ખાણ");
    t!("gu", "label.risk", "જોખમ");
    t!("gu", "label.time", "સમય");
    t!("gu", "label.score", "સ્કોર");
    t!("gu", "system.name", "AI ખડક પતન સિસ્ટમ");
    t!("gu", "severity.HIGH", "વધુ જોખમ");
    t!("gu", "severity.MEDIUM", "મધ્યમ જોખમ");
    t!("gu", "severity.LOW", "ઓછું જોખમ");
    t!("gu", "action.HIGH", "તુરંત બહાર નીકળો! કામ બંધ કરો!");
    t!("gu", "action.MEDIUM", "પ્રવેશ મર્યાદિત કરો. દેખરેખ વધારો.");
    t!("gu", "action.LOW", "સાવધાન રહો. દેખરેખ ચાલુ રાખો.");

    // ---- Marathi ----
    t!("mr", "sms.header", "खडक कोसळण्याची सूचना");
    t!("mr", "label.facility", "खाण");
    t!("mr", "label.risk", "धोका");
    t!("mr", "label.time", "वेळ");
    t!("mr", "label.score", "स्कोअर");
    t!("mr", "system.name", "AI खडक कोसळणे सिस्टम");
    t!("mr", "severity.HIGH", "अधिक धोका");
    t!("mr", "severity.MEDIUM", "मध्यम धोका");
    t!("mr", "severity.LOW", "कमी धोका");
    t!("mr", "action.HIGH", "ताबडतोब बाहेर पडा! काम बंद करा!");
    t!("mr", "action.MEDIUM", "प्रवेश मर्यादित करा. देखरेख वाढवा.");
    t!("mr", "action.LOW", "सावध राहा. देखरेख चालू ठेवा.");

    // ---- Kannada ----
    t!("kn", "sms.header", "ಬಂಡೆ ಕುಸಿತ ಎಚ್ಚರಿಕೆ");
    t!("kn", "label.facility", "ಗಣಿ");
    t!("kn", "label.risk", "ಅಪಾಯ");
    t!("kn", "label.time", "ಸಮಯ");
    t!("kn", "label.score", "ಸ್ಕೋರ್");
    t!("kn", "system.name", "AI ಬಂಡೆ ಕುಸಿತ ಸಿಸ್ಟಂ");
    t!("kn", "severity.HIGH", "ಹೆಚ್ಚು ಅಪಾಯ");
    t!("kn", "severity.MEDIUM", "ಮಧ್ಯಮ ಅಪಾಯ");
    t!("kn", "severity.LOW", "ಕಡಿಮೆ ಅಪಾಯ");
    t!("kn", "action.HIGH", "ತಕ್ಷಣವೇ ಹೊರಬನ್ನಿ! ಕೆಲಸ ನಿಲ್ಲಿಸಿ!");
    t!("kn", "action.MEDIUM", "ಪ್ರವೇಶ ಸೀಮಿತಗೊಳಿಸಿ. ಮೇಲ್ವಿಚಾರಣೆ ಹೆಚ್ಚಿಸಿ.");
    t!("kn", "action.LOW", "ಎಚ್ಚರದಿಂದಿರಿ. ಮೇಲ್ವಿಚಾರಣೆ ಮುಂದುವರಿಸಿ.");

    // ---- Telugu ----
    t!("te", "sms.header", "రాతిపటన హెచ్చరిక");
    t!("te", "label.facility", "గని");
    t!("te", "label.risk", "ప్రమాదం");
    t!("te", "label.time", "సమయం");
    t!("te", "label.score", "స్కోర్");
    t!("te", "system.name", "AI రాతిపటన వ్యవస్థ");
    t!("te", "severity.HIGH", "ఎక్కువ ప్రమాదం");
    t!("te", "severity.MEDIUM", "మధ్యమ ప్రమాదం");
    t!("te", "severity.LOW", "తక్కువ ప్రమాదం");
    t!("te", "action.HIGH", "వెంటనే బయటకు వెళ్లండి! పని ఆపండి!");
    t!("te", "action.MEDIUM", "ప్రవేశం పరిమితం చేయండి. పర్యవేక్షణ పెంచండి.");
    t!("te", "action.LOW", "జాగ్రత్తగా ఉండండి. పర్యవేక్షణ కొనసాగించండి.");

    // ---- Sensor factor labels (only some languages carry these) ----
    t!("en", "factor.vibration", "Vibration");
    t!("en", "factor.temperature", "Temp");
    t!("en", "factor.humidity", "Humidity");
    t!("en", "factor.pressure", "Pressure");
    t!("en", "factor.acoustic", "Sound");
    t!("en", "factor.slope_stability", "Slope");
    t!("hi", "factor.vibration", "कंपन");
    t!("hi", "factor.temperature", "तापमान");
    t!("hi", "factor.humidity", "नमी");
    t!("hi", "factor.pressure", "दबाव");
    t!("hi", "factor.acoustic", "ध्वनि");
    t!("hi", "factor.slope_stability", "ढलान");
    t!("bn", "factor.vibration", "কম্পন");
    t!("bn", "factor.temperature", "তাপমাত্রা");
    t!("bn", "factor.humidity", "আর্দ্রতা");
    t!("bn", "factor.pressure", "চাপ");
    t!("bn", "factor.acoustic", "শব্দ");
    t!("bn", "factor.slope_stability", "ঢাল");
    t!("or", "factor.vibration", "କମ୍ପନ");
    t!("or", "factor.temperature", "ତାପମାତ୍ରା");
    t!("or", "factor.humidity", "ଆର୍ଦ୍ରତା");
    t!("or", "factor.pressure", "ଚାପ");
    t!("or", "factor.acoustic", "ଧ୍ୱନି");
    t!("or", "factor.slope_stability", "ଢାଲୁ");

    // ---- Email headings (English + Hindi) ----
    t!("en", "email.title", "ROCKFALL RISK ALERT");
    t!("hi", "email.title", "शिलाखंड जोखिम अलर्ट");
    t!("en", "email.facility_info", "Mine Information");
    t!("hi", "email.facility_info", "खान की जानकारी");
    t!("en", "email.location", "Location");
    t!("hi", "email.location", "स्थान");
    t!("en", "email.alert_time", "Alert Time");
    t!("hi", "email.alert_time", "अलर्ट समय");
    t!("en", "email.analysis", "AI Risk Analysis");
    t!("hi", "email.analysis", "AI जोखिम विश्लेषण");
    t!("en", "email.factors", "Key Contributing Factors");
    t!("hi", "email.factors", "मुख्य योगदान कारक");
    t!("en", "email.key_factors", "Key Risk Factors");
    t!("hi", "email.key_factors", "मुख्य जोखिम कारक");
    t!("en", "email.violations", "Threshold Violations");
    t!("hi", "email.violations", "सीमा उल्लंघन");
    t!("en", "email.recommendations", "AI Recommendations");
    t!("hi", "email.recommendations", "AI सिफारिशें");
    t!("en", "email.actions", "Immediate Actions Required");
    t!("hi", "email.actions", "तत्काल आवश्यक कार्य");
    t!(
        "en",
        "email.footer",
        "This is an automated alert from the AI-Based Rockfall Prediction System."
    );
    t!(
        "hi",
        "email.footer",
        "यह AI-आधारित शिलाखंड भविष्यवाणी सिस्टम से एक स्वचालित अलर्ट है।"
    );
    t!(
        "en",
        "email.emergency",
        "For emergency situations, contact Emergency Services - 108"
    );
    t!(
        "hi",
        "email.emergency",
        "आपातकालीन स्थितियों के लिए संपर्क करें - 108"
    );

    // ---- Email action bullets ----
    t!(
        "en",
        "email.action.evacuate",
        "IMMEDIATELY evacuate all personnel from high-risk areas"
    );
    t!(
        "hi",
        "email.action.evacuate",
        "तुरंत सभी कर्मचारियों को उच्च जोखिम वाले क्षेत्रों से हटाएं"
    );
    t!(
        "en",
        "email.action.stop_operations",
        "Stop all mining operations in affected zones"
    );
    t!(
        "hi",
        "email.action.stop_operations",
        "प्रभावित क्षेत्रों में सभी खनन कार्य बंद करें"
    );
    t!("en", "email.action.deploy_response", "Deploy emergency response teams");
    t!(
        "hi",
        "email.action.deploy_response",
        "आपातकालीन प्रतिक्रिया टीम तैनात करें"
    );
    t!(
        "en",
        "email.action.activate_comms",
        "Activate emergency communication protocols"
    );
    t!(
        "hi",
        "email.action.activate_comms",
        "आपातकालीन संचार प्रोटोकॉल सक्रिय करें"
    );
    t!(
        "en",
        "email.action.contact_authorities",
        "Contact local authorities and emergency services"
    );
    t!(
        "hi",
        "email.action.contact_authorities",
        "स्थानीय अधिकारियों और आपातकालीन सेवाओं से संपर्क करें"
    );
    t!(
        "en",
        "email.action.increase_sensors",
        "Increase monitoring sensor frequency"
    );
    t!(
        "hi",
        "email.action.increase_sensors",
        "निगरानी सेंसर की आवृत्ति बढ़ाएं"
    );
    t!(
        "en",
        "email.action.restrict_access",
        "Restrict access to potentially unstable areas"
    );
    t!(
        "hi",
        "email.action.restrict_access",
        "संभावित रूप से अस्थिर क्षेत्रों में प्रवेश प्रतिबंधित करें"
    );
    t!("en", "email.action.increase_monitoring", "Increase monitoring frequency");
    t!(
        "hi",
        "email.action.increase_monitoring",
        "निगरानी की आवृत्ति बढ़ाएं"
    );
    t!(
        "en",
        "email.action.review_protocols",
        "Review and update safety protocols"
    );
    t!(
        "hi",
        "email.action.review_protocols",
        "सुरक्षा प्रोटोकॉल की समीक्षा और अपडेट करें"
    );
    t!(
        "en",
        "email.action.brief_personnel",
        "Brief all personnel on current risk status"
    );
    t!(
        "hi",
        "email.action.brief_personnel",
        "वर्तमान जोखिम स्थिति पर सभी कर्मचारियों को जानकारी दें"
    );
    t!("en", "email.action.prepare_evacuation", "Prepare evacuation procedures");
    t!(
        "hi",
        "email.action.prepare_evacuation",
        "निकासी प्रक्रियाओं की तैयारी करें"
    );
    t!(
        "en",
        "email.action.continue_operations",
        "Continue normal operations with standard precautions"
    );
    t!(
        "hi",
        "email.action.continue_operations",
        "मानक सावधानियों के साथ सामान्य परिचालन जारी रखें"
    );
    t!(
        "en",
        "email.action.maintain_schedule",
        "Maintain regular monitoring schedule"
    );
    t!(
        "hi",
        "email.action.maintain_schedule",
        "नियमित निगरानी कार्यक्रम बनाए रखें"
    );
    t!(
        "en",
        "email.action.watch_changes",
        "Monitor for any changes in conditions"
    );
    t!(
        "hi",
        "email.action.watch_changes",
        "स्थितियों में किसी भी बदलाव पर नजर रखें"
    );

    Translations { map }
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_match_is_case_insensitive_substring() {
        assert_eq!(region_for("Dhanbad, JHARKHAND"), RegionCode::Jharkhand);
        assert_eq!(region_for("Asansol, West Bengal"), RegionCode::WestBengal);
        assert_eq!(
            region_for("Singrauli, Madhya Pradesh"),
            RegionCode::MadhyaPradesh
        );
        assert_eq!(region_for("Goa"), RegionCode::Default);
        assert_eq!(region_for(""), RegionCode::Default);
    }

    #[test]
    fn test_unmatched_region_uses_two_language_fallback() {
        let langs = languages_for(region_for("Somewhere else"));
        assert_eq!(langs, &[Language::Hindi, Language::English]);
    }

    #[test]
    fn test_every_region_ends_in_universal_language() {
        for (region, langs) in REGION_LANGUAGES {
            assert_eq!(
                langs.last(),
                Some(&UNIVERSAL_LANGUAGE),
                "region {region:?} does not end in the universal language"
            );
        }
    }

    #[test]
    fn test_every_pattern_region_has_language_list() {
        for (_, region) in REGION_PATTERNS {
            assert!(REGION_LANGUAGES.iter().any(|(code, _)| code == region));
        }
    }

    #[test]
    fn test_all_languages_have_required_keys() {
        let t = &*TRANSLATIONS;
        for lang in Language::ALL {
            for key in REQUIRED_KEYS {
                assert!(
                    t.get_template(lang.code(), key).is_some(),
                    "Missing {} translation for key: {key}",
                    lang.code()
                );
            }
        }
    }

    #[test]
    fn test_english_covers_every_key() {
        let t = &*TRANSLATIONS;
        let keys: std::collections::HashSet<&str> = t.map.keys().map(|(_, key)| *key).collect();
        for key in keys {
            assert!(
                t.map.contains_key(&("en", key)),
                "Missing en translation for key: {key}"
            );
        }
    }

    #[test]
    fn test_localized_skips_languages_without_key() {
        let t = &*TRANSLATIONS;
        let s = t.localized(
            "factor.vibration",
            &[Language::Kannada, Language::Hindi, Language::English],
        );
        assert_eq!(s, "कंपन | Vibration");
    }

    #[test]
    fn test_get_template_does_not_fall_back() {
        let t = &*TRANSLATIONS;
        assert_eq!(t.get_template("en", "factor.vibration"), Some("Vibration"));
        assert_eq!(t.get_template("kn", "factor.vibration"), None);
        assert_eq!(t.get_template("en", "nonexistent.key"), None);
    }

    #[test]
    fn test_email_action_keys_are_translated() {
        let t = &*TRANSLATIONS;
        for severity in Severity::ALL {
            for key in email_action_keys(severity) {
                assert!(t.get_template("en", key).is_some(), "{key}");
                assert!(t.get_template("hi", key).is_some(), "{key}");
            }
        }
    }
}
