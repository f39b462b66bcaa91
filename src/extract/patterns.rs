use crate::models::{PerSpeakerCounts, RepeatInstance, SpeakerRole, Utterance};

use super::{split_sentences, word_tokens, AnalysisContext};

/// Tokens shown either side of a repeat run
const REPEAT_CONTEXT_TOKENS: usize = 5;

/// Count turns, words, sentences, questions, disfluencies, overlap markers
/// and immediate repeats per speaker role
pub fn extract(utterances: &[Utterance], context: &AnalysisContext) -> PerSpeakerCounts {
    let mut counts = PerSpeakerCounts::default();

    for utterance in utterances {
        let tokens = word_tokens(&utterance.spoken_text);
        let disfluencies = tokens.iter().filter(|t| context.is_disfluency(t)).count();
        let runs = detect_repeats(&tokens, context, utterance.index, utterance.speaker);
        let repeats: usize = runs.iter().map(|r| r.run_length - 1).sum();

        let speaker = counts.get_mut(utterance.speaker);
        speaker.turns += 1;
        speaker.words += word_tokens(&utterance.clean_text).len();
        // A turn without terminal punctuation, or with only fillers and
        // annotations, is still one sentence
        speaker.sentences += split_sentences(&utterance.clean_text).len().max(1);
        speaker.questions += utterance.spoken_text.matches('?').count();
        speaker.overlaps += utterance.spoken_text.matches('/').count();
        speaker.disfluencies += disfluencies;
        speaker.repeats += repeats;

        for run in runs {
            *counts.repeats_by_word.entry(run.word.clone()).or_insert(0) += run.run_length - 1;
            counts.repeat_instances.push(run);
        }
    }

    counts
}

/// Find runs of identical adjacent tokens
///
/// A run of length `n` holds `n - 1` repeated pairs. Runs of disfluency
/// tokens ("um um") are fillers, not repeats, and are skipped.
pub fn detect_repeats(
    tokens: &[String],
    context: &AnalysisContext,
    utterance_index: usize,
    speaker: SpeakerRole,
) -> Vec<RepeatInstance> {
    let mut runs = Vec::new();
    let mut i = 0;

    while i + 1 < tokens.len() {
        let word = &tokens[i];
        let mut j = i + 1;
        while j < tokens.len() && tokens[j] == *word {
            j += 1;
        }

        if j - i > 1 && !context.is_disfluency(word) {
            runs.push(RepeatInstance {
                word: word.clone(),
                run_length: j - i,
                position: i,
                context: highlight_context(tokens, i, j),
                utterance_index,
                speaker,
            });
        }
        i = j;
    }

    runs
}

fn highlight_context(tokens: &[String], run_start: usize, run_end: usize) -> String {
    let from = run_start.saturating_sub(REPEAT_CONTEXT_TOKENS);
    let to = (run_end + REPEAT_CONTEXT_TOKENS).min(tokens.len());

    (from..to)
        .map(|idx| {
            if (run_start..run_end).contains(&idx) {
                format!("**{}**", tokens[idx])
            } else {
                tokens[idx].clone()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
