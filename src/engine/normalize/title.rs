// src/engine/normalize/title.rs

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{
    engine::normalize::{
        subject::{aliases_of, canonical_subject, normalize_subject},
        year::{find_session, parse_year},
    },
    utils::text::{collapse_whitespace, fold, is_all_caps, sentence_case},
};

const SERIES_CODE: &str = r"(?:SVT|SES|SMP|LLA|SMS)";

fn series_list() -> String {
    format!(
        r"{code}(?:\s*(?:,|/|-|&|\bet\b)\s*{code})*",
        code = SERIES_CODE
    )
}

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("title regex must compile")
}

static LABELLED_SERIES: Lazy<Regex> = Lazy::new(|| {
    re(&format!(
        r"(?i)\b(?:s[ée]ries?|fili[èe]res?|sections?)\s*:?\s*(?-i:({}))",
        series_list()
    ))
});
static PARENTHESIZED_SERIES: Lazy<Regex> =
    Lazy::new(|| re(&format!(r"\(\s*({})\s*\)", series_list())));
static BARE_SERIES: Lazy<Regex> = Lazy::new(|| re(&format!(r"\b({})\b", series_list())));
static SERIES_TOKEN: Lazy<Regex> = Lazy::new(|| re(SERIES_CODE));

/// Institutional boilerplate, longest and most specific first.
///
/// Later entries are more general and would eat parts of earlier matches
/// (the bare-year rule inside a month-year session, "examen" inside
/// "examens de fin d'études secondaires").
static BOILERPLATE: Lazy<Vec<Regex>> = Lazy::new(|| {
    let mut patterns = vec![
        r"(?i)minist[èe]re\s+de\s+l['’]\s*[ée]ducation\s+nationale(?:\s+et\s+de\s+la\s+formation\s+professionnelle)?".to_string(),
        r"(?i)minist[èe]\s+edikasyon\s+nasyonal(?:\s+ak\s+f[òo]masyon\s+pwofesyon[èe]l)?".to_string(),
        r"\(?\s*\bMENFP\b\s*\)?".to_string(),
        r"(?i)r[ée]publique\s+d['’]\s*ha[ïi]ti|repiblik\s+d\s*['’]?\s*ayiti".to_string(),
        r"(?i)direction\s+(?:des|de\s+l['’])\s*examens?(?:\s+d['’]\s*[ée]tat)?|\bBUNEXE\b".to_string(),
        r"(?i)examens?\s+de\s+fin\s+d['’]\s*[ée]tudes\s+secondaires".to_string(),
        r"(?i)egzamen\s+(?:leta|fen\s+etid\s+segond[èe])".to_string(),
        r"(?i)baccalaur[ée]at(?:\s+(?:unique|permanent|ha[ïi]tien))?|\bbacc?\b".to_string(),
        r"(?i)nouveau\s+secondaire(?:\s+[ivx]+\b)?|\bNS\s?[1-4]\b".to_string(),
        r"(?i)(?:classe\s+de\s+)?\bterminale\b|\brh[ée]to(?:rique)?\b".to_string(),
    ];
    patterns.push(format!(
        r"(?i)\b(?:s[ée]ries?|fili[èe]res?|sections?)\s*:?\s*(?-i:{})",
        series_list()
    ));
    patterns.push(format!(r"\(\s*{}\s*\)", series_list()));
    patterns.push(format!(r"\b{}\b", series_list()));
    patterns.extend([
        r"(?i)\b(?:session\s+(?:de\s+|d['’]\s*)?)?(?:janvier|f[ée]vrier|mars|avril|mai|juin|juillet|ao[uû]t|septembre|octobre|novembre|d[ée]cembre)\s*,?\s*(?:19|20)\d{2}\b".to_string(),
        r"(?i)\bsession(?:\s+(?:ordinaire|extraordinaire|normale|sp[ée]ciale|unique|de\s+remplacement))?\b".to_string(),
        r"(?i)\bann[ée]e\s+(?:scolaire|acad[ée]mique)\b".to_string(),
        r"\b(?:19|20)\d{2}(?:\s*[-–/]\s*(?:19|20)\d{2})?\b".to_string(),
        r"(?i)\bdur[ée]e\s*:?\s*\d+\s*h(?:eures?)?(?:\s*\d+)?(?:\s*min(?:utes)?)?".to_string(),
        r"(?i)\bcoefficient\s*:?\s*\d+".to_string(),
        r"(?i)\b(?:examens?|[ée]preuves?)(?:\s+officiel(?:le)?s?)?(?:\s+(?:de|du|des)\b|\s+d['’])?".to_string(),
    ]);
    patterns.iter().map(|p| re(p)).collect()
});

static SEPARATORS: Lazy<Regex> = Lazy::new(|| re(r"\s+-\s+|[—–|·:()\[\]/]"));
static SERIES_SHAPED: Lazy<Regex> =
    Lazy::new(|| re(&format!(r"^(?:{}|NS\s?\d)(?:[\s,/&+\-]+(?:{}|NS\s?\d))*$", SERIES_CODE, SERIES_CODE)));

const CONNECTORS: [&str; 12] = [
    "de", "du", "des", "d'", "la", "le", "les", "l'", "et", "en", "of", "the",
];

/// Series codes ("SVT, SMP") named in a raw title.
///
/// Labelled ("Série : SVT") and parenthesised lists win over bare codes; a bare
/// code that is only the subject itself (an SVT exam) is not a series.
pub fn extract_series(raw_title: &str, subject: &str) -> String {
    let list = LABELLED_SERIES
        .captures(raw_title)
        .or_else(|| PARENTHESIZED_SERIES.captures(raw_title))
        .map(|caps| caps[1].to_string())
        .or_else(|| {
            BARE_SERIES
                .captures_iter(raw_title)
                .map(|caps| caps[1].to_string())
                .find(|list| list.as_str() != subject)
        });

    let Some(list) = list else {
        return String::new();
    };

    let mut codes: Vec<&str> = Vec::new();
    for token in SERIES_TOKEN.find_iter(&list) {
        if !codes.contains(&token.as_str()) {
            codes.push(token.as_str());
        }
    }
    codes.join(", ")
}

/// Removes a subject label from `text` where it stands as a whole word.
fn remove_label(text: &str, label: &str) -> String {
    let label = label.trim();
    if label.is_empty() {
        return text.to_string();
    }
    let pattern = format!(
        r"(?i)(^|[^\p{{L}}\p{{N}}_]){}($|[^\p{{L}}\p{{N}}_])",
        regex::escape(label)
    );
    match Regex::new(&pattern) {
        Ok(regex) => regex.replace_all(text, "${1} ${2}").into_owned(),
        Err(e) => {
            tracing::debug!("Skipping subject label {:?}: {}", label, e);
            text.to_string()
        }
    }
}

fn strip_connectors(fragment: &str) -> String {
    let mut words: Vec<&str> = fragment.split_whitespace().collect();
    let is_connector = |w: &str| CONNECTORS.contains(&fold(w).as_str());
    while words.first().is_some_and(|w| is_connector(w)) {
        words.remove(0);
    }
    while words.last().is_some_and(|w| is_connector(w)) {
        words.pop();
    }
    words.join(" ")
}

/// Leftover fragment worth keeping as the topic?
fn is_topic_fragment(fragment: &str, subject_key: &str) -> bool {
    if fragment.chars().count() <= 2 {
        return false;
    }
    if SERIES_SHAPED.is_match(fragment) {
        return false;
    }
    let single_word = !fragment.contains(char::is_whitespace);
    if single_word && !subject_key.is_empty() && subject_key.contains(&fold(fragment)) {
        return false;
    }
    true
}

/// All-caps topics become sentence case; anything else is kept as written.
fn smart_case(topic: &str) -> String {
    if is_all_caps(topic) {
        sentence_case(topic)
    } else {
        topic.to_string()
    }
}

/// Builds a display title `"{Subject} — {Topic} · {Series} · {Session-or-Year}"`.
///
/// Empty segments are omitted. The canonical subject and the year (or the
/// month-year session) always come from the exam metadata, so they survive
/// however aggressively the boilerplate rules strip the raw title.
pub fn normalize_title(raw_title: &str, raw_subject: &str, raw_year: &str) -> String {
    let subject = normalize_subject(raw_subject);

    // Read from the untouched title: stripping destroys both.
    let series = extract_series(raw_title, &subject);
    let dated = find_session(raw_title).unwrap_or_else(|| parse_year(raw_year));
    let when = if !dated.session.is_empty() {
        dated.session
    } else {
        let year = match parse_year(raw_year).year {
            0 => parse_year(raw_title).year,
            y => y,
        };
        if year > 0 { year.to_string() } else { String::new() }
    };

    let mut remaining = raw_title.to_string();
    for pattern in BOILERPLATE.iter() {
        remaining = pattern.replace_all(&remaining, " ").into_owned();
    }

    let mut labels: Vec<String> = vec![subject.clone(), raw_subject.trim().to_string()];
    if let Some(canonical) = canonical_subject(raw_subject) {
        labels.extend(aliases_of(canonical).map(str::to_string));
    }
    labels.sort_by_key(|l| std::cmp::Reverse(l.chars().count()));
    for label in &labels {
        remaining = remove_label(&remaining, label);
    }

    let subject_key = fold(&subject);
    let fragments: Vec<String> = SEPARATORS
        .split(&remaining)
        .map(|f| {
            let f = collapse_whitespace(f);
            let f = f.trim_matches(|c: char| c.is_whitespace() || ".,;:'’\"-".contains(c));
            strip_connectors(f)
        })
        .filter(|f| is_topic_fragment(f, &subject_key))
        .collect();
    let topic = smart_case(&fragments.join(" – "));

    let mut head = subject;
    if !topic.is_empty() {
        head = if head.is_empty() {
            topic
        } else {
            format!("{} — {}", head, topic)
        };
    }

    let segments: Vec<String> = [head, series, when]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect();
    if segments.is_empty() {
        return raw_title.trim().to_string();
    }
    segments.join(" · ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ministry_title() {
        let raw = "MINISTÈRE DE L'ÉDUCATION NATIONALE ET DE LA FORMATION PROFESSIONNELLE (MENFP) — \
                   Baccalauréat Unique — Chimie (SVT, SMP) — CHIMIE ORGANIQUE — Session Juin 2019";
        assert_eq!(
            normalize_title(raw, "Chimie (SVT, SMP)", "2019"),
            "Chimie — Organique · SVT, SMP · Juin 2019"
        );
    }

    #[test]
    fn test_kreyol_header() {
        let raw = "Repiblik d'Ayiti — Ministè Edikasyon Nasyonal ak Fòmasyon Pwofesyonèl — \
                   Egzamen Leta — Matematik — Fonksyon ak Derive (SMP) 2017";
        assert_eq!(
            normalize_title(raw, "Mathématiques", "2017"),
            "Mathématiques — Fonksyon ak Derive · SMP · 2017"
        );
    }

    #[test]
    fn test_only_boilerplate_left() {
        assert_eq!(
            normalize_title("Examen de Philosophie - Bac 2018", "Philosophie", "2018"),
            "Philosophie · 2018"
        );
    }

    #[test]
    fn test_year_range_uses_latest() {
        assert_eq!(
            normalize_title("Anglais", "english", "2016-2022"),
            "Anglais · 2022"
        );
    }

    #[test]
    fn test_subject_fragment_dropped() {
        // "Math" is a piece of the subject name, not a topic.
        assert_eq!(
            normalize_title("Math - Géométrie dans l'espace", "Mathématiques", "2020"),
            "Mathématiques — Géométrie dans l'espace · 2020"
        );
    }

    #[test]
    fn test_svt_subject_is_not_a_series() {
        assert_eq!(
            normalize_title("SVT — Génétique — 2021", "SVT", "2021"),
            "SVT — Génétique · 2021"
        );
    }

    #[test]
    fn test_labelled_series() {
        assert_eq!(extract_series("Physique, Séries : SMP/SVT", "Physique"), "SMP, SVT");
        assert_eq!(extract_series("Physique", "Physique"), "");
    }
}
