//! Keyword-based sentiment scoring for Portuguese business text

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashSet;

const POSITIVE_WORDS: &[&str] = &[
    "bom", "boa", "otimo", "otima", "excelente", "excepcional", "satisfeito", "satisfeita",
    "eficiente", "rapido", "rapida", "qualidade", "confiavel", "recomendo", "parceria",
    "sucesso", "aprovado", "aprovada", "positivo", "positiva", "inovador", "inovadora",
    "eficaz", "seguro", "segura", "agil", "perfeito", "perfeita", "feliz", "crescimento",
    "lucro", "conformidade", "melhoria", "obrigado", "obrigada", "adorei", "gostei",
];

const NEGATIVE_WORDS: &[&str] = &[
    "ruim", "pessimo", "pessima", "terrivel", "horrivel", "insatisfeito", "insatisfeita",
    "lento", "lenta", "atraso", "atrasado", "atrasada", "problema", "problemas", "falha",
    "falhas", "erro", "erros", "defeito", "reprovado", "reprovada", "negativo", "negativa",
    "caro", "cara", "risco", "perda", "prejuizo", "reclamacao", "cancelado", "cancelada",
    "inseguro", "insegura", "irregular", "multa", "recall", "odiei", "decepcionado",
];

static POSITIVE: Lazy<HashSet<&'static str>> = Lazy::new(|| POSITIVE_WORDS.iter().copied().collect());
static NEGATIVE: Lazy<HashSet<&'static str>> = Lazy::new(|| NEGATIVE_WORDS.iter().copied().collect());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

#[derive(Debug, Clone, Serialize)]
pub struct SentimentResult {
    /// In [-1, 1]
    pub score: f64,
    pub label: SentimentLabel,
    /// In [0, 1], grows with the number of matched keywords
    pub confidence: f64,
    pub positive_matches: Vec<String>,
    pub negative_matches: Vec<String>,
}

/// Lowercase and drop Portuguese diacritics
fn fold(word: &str) -> String {
    word.to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

pub fn analyze_sentiment(text: &str) -> SentimentResult {
    let mut positive_matches = Vec::new();
    let mut negative_matches = Vec::new();

    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        let word = fold(token);
        if POSITIVE.contains(word.as_str()) {
            positive_matches.push(word);
        } else if NEGATIVE.contains(word.as_str()) {
            negative_matches.push(word);
        }
    }

    let positive = positive_matches.len() as f64;
    let negative = negative_matches.len() as f64;
    let total = positive + negative;

    let score = if total == 0.0 {
        0.0
    } else {
        ((positive - negative) / total).clamp(-1.0, 1.0)
    };

    let label = if score > 0.2 {
        SentimentLabel::Positive
    } else if score < -0.2 {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    };

    SentimentResult {
        score,
        label,
        confidence: (total / 5.0).min(1.0),
        positive_matches,
        negative_matches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_text() {
        let result = analyze_sentiment("Excelente parceria, serviço rápido e de ótima qualidade!");
        assert_eq!(result.label, SentimentLabel::Positive);
        assert_eq!(result.score, 1.0);
        assert!(result.positive_matches.contains(&"rapido".to_string()));
        assert!(result.negative_matches.is_empty());
    }

    #[test]
    fn test_negative_text() {
        let result = analyze_sentiment("Houve atraso na entrega e um problema grave no laudo. Péssimo.");
        assert_eq!(result.label, SentimentLabel::Negative);
        assert_eq!(result.score, -1.0);
        assert_eq!(result.negative_matches.len(), 3);
    }

    #[test]
    fn test_mixed_and_neutral() {
        let mixed = analyze_sentiment("bom atendimento, mas com atraso");
        assert_eq!(mixed.score, 0.0);
        assert_eq!(mixed.label, SentimentLabel::Neutral);

        let none = analyze_sentiment("Reunião marcada para terça-feira.");
        assert_eq!(none.score, 0.0);
        assert_eq!(none.confidence, 0.0);
    }

    #[test]
    fn test_score_always_in_range() {
        for text in ["", "ruim ruim bom", "ótimo ótimo ótimo ruim", "recall multa risco"] {
            let result = analyze_sentiment(text);
            assert!((-1.0..=1.0).contains(&result.score));
            assert!((0.0..=1.0).contains(&result.confidence));
        }
    }
}
