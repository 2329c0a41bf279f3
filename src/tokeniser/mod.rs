use tokenizers::{normalizers::BertNormalizer, pre_tokenizers::bert::BertPreTokenizer, NormalizedString, Normalizer, OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer};

/// Split description text into lowercase word tokens.
///
/// Splits that contain no alphabetic character are dropped: punctuation,
/// store numbers and card suffixes carry no category signal.
pub(crate) fn tokenise(text: &str) -> Vec<String> {
    let normaliser = BertNormalizer::new(true, true, None, true);
    let mut normalised = NormalizedString::from(text);
    if normaliser.normalize(&mut normalised).is_err() {
        return vec![];
    }

    let pre_tokenizer = BertPreTokenizer {};
    let mut pre_tokenised = PreTokenizedString::from(normalised.get());
    if pre_tokenizer.pre_tokenize(&mut pre_tokenised).is_err() {
        return vec![];
    }

    pre_tokenised.get_splits(OffsetReferential::Original, OffsetType::Byte)
        .into_iter()
        .filter(|s| s.0.chars().any(|c| c.is_alphabetic()))
        .map(|s| s.0.to_string())
        .collect()
}
