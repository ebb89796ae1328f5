/*!
# Answer Composer

Builds the system instruction for the answer call and turns the completion
text into the user-facing reply with citations.
*/

use crate::query::QueryAnalysis;
use crate::scorer::ScoredCandidate;
use askerbot_core::{
    AskerError, ChatConfig, CompletionPurpose, CompletionRequest, Result, Source,
};
use chrono::{Datelike, NaiveDateTime, Timelike};
use std::fmt::Write;

/// Sentence the model must use when the context has nothing to offer
pub const NOT_FOUND_SENTENCE: &str =
    "Uffda, her ble jeg stående uvitende i offside, prøv denne lenken eller endre spørsmålet!";

const WEEKDAYS: [&str; 7] = [
    "mandag", "tirsdag", "onsdag", "torsdag", "fredag", "lørdag", "søndag",
];

const MONTHS: [&str; 12] = [
    "januar", "februar", "mars", "april", "mai", "juni", "juli", "august", "september",
    "oktober", "november", "desember",
];

/// `tirsdag 3. juni 2025 kl. 14:05`
pub fn norwegian_timestamp(now: NaiveDateTime) -> String {
    let weekday = WEEKDAYS[now.weekday().num_days_from_monday() as usize];
    let month = MONTHS[now.month0() as usize];
    format!(
        "{} {}. {} {} kl. {:02}:{:02}",
        weekday,
        now.day(),
        month,
        now.year(),
        now.hour(),
        now.minute()
    )
}

/// System instruction with the retrieved snippets embedded as ground truth
pub fn system_prompt(
    analysis: &QueryAnalysis,
    snippets: &[ScoredCandidate],
    now: NaiveDateTime,
) -> String {
    let mut prompt = format!(
        "Du er Askerbot – Asker Fotballs digitale assistent.\n\
         \n\
         AKTUELL DATO OG TID: {}\n\
         \n\
         GRUNNLEGGENDE REGLER:\n\
         - Bygg svaret på informasjonen fra kunnskapsbasen nedenfor\n\
         - Tolk informasjonen og trekk fornuftige slutninger når den ikke svarer helt direkte\n\
         - Si bare at du mangler informasjon når den faktisk mangler\n\
         \n\
         SVARSTIL:\n\
         - Svar på norsk, vennlig og direkte\n\
         - Maks 3-4 linjer\n\
         - Bruk vanlige linjeskift, IKKE markdown\n\
         - Gi praktiske råd når det passer\n\
         \n\
         SPØRSMÅL ANALYSE:\n\
         - Intent: {}\n\
         - Søkeord: {}\n\
         \n\
         INSTRUKSJONER:\n\
         1. Les all tilgjengelig informasjon nøye\n\
         2. Finn det som er mest relevant for spørsmålet\n\
         3. Formuler et kort og nyttig svar\n\
         4. Mangler informasjonen helt, svar nøyaktig: \"{}\"",
        norwegian_timestamp(now),
        analysis.intent.as_deref().unwrap_or("generell"),
        analysis.keywords.join(", "),
        NOT_FOUND_SENTENCE,
    );

    if snippets.is_empty() {
        let _ = write!(
            prompt,
            "\n\nFALLBACK: Finner du ikke relevant informasjon, svar: \"{}\"",
            NOT_FOUND_SENTENCE
        );
        return prompt;
    }

    prompt.push_str("\n\nDU HAR TILGANG TIL FØLGENDE INFORMASJON FRA ASKER FOTBALL:\n\n");
    for (i, snippet) in snippets.iter().enumerate() {
        let c = &snippet.candidate;
        let _ = write!(
            prompt,
            "[Kilde {}] {}\nURL: {}\nRELEVANSSKORE: {:.2}\n",
            i + 1,
            c.title,
            c.url,
            snippet.score
        );
        if let Some(date) = &c.date {
            let _ = writeln!(prompt, "DATO: {}", date);
        }
        let _ = write!(prompt, "\nINNHOLD:\n{}\n\n---\n\n", c.body);
    }
    prompt
}

/// The answer call: system instruction plus the user's own question
pub fn answer_request(
    config: &ChatConfig,
    analysis: &QueryAnalysis,
    snippets: &[ScoredCandidate],
    question: &str,
    now: NaiveDateTime,
) -> CompletionRequest {
    CompletionRequest {
        purpose: CompletionPurpose::Answer,
        model: Some(config.model.clone()),
        system: system_prompt(analysis, snippets, now),
        user: question.trim().to_string(),
        temperature: config.answer_temperature,
        max_tokens: config.answer_max_tokens,
    }
}

/// Trim the completion; an empty answer is an upstream error
pub fn finish_answer(text: &str) -> Result<String> {
    let answer = text.trim();
    if answer.is_empty() {
        return Err(AskerError::EmptyCompletion);
    }
    Ok(answer.to_string())
}

/// Top `max` snippets as citations, scores rounded to two decimals
pub fn citations(snippets: &[ScoredCandidate], max: usize) -> Vec<Source> {
    snippets
        .iter()
        .take(max)
        .map(|s| Source {
            title: s.candidate.title.clone(),
            url: s.candidate.url.clone(),
            score: (s.score * 100.0).round() / 100.0,
        })
        .collect()
}
