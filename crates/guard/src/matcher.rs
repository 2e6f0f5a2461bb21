/*
  ____                 __               __   _ __
 / __ \__ _____ ____  / /___ ____ _    / /  (_) /
/ /_/ / // / _ `/ _ \/ __/ // /  ' \  / /__/ / _ \
\___\_\_,_/\_,_/_//_/\__/\_,_/_/_/_/ /____/_/_.__/
    Part of the Quantum OS Project

Copyright 2025 Gavin Kellam

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and
associated documentation files (the "Software"), to deal in the Software without restriction,
including without limitation the rights to use, copy, modify, merge, publish, distribute,
sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or substantial
portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT
NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM,
DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT
OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.
*/

use core::ops::Range;

const IF_DIRECTIVE: &str = "#if";
const DEFINED: &str = "!defined";
const DEFINE_LINE: &str = "\n#define";
const ENDIF_DIRECTIVE: &str = "#endif";
const LINE_COMMENT: &str = "//";

/// # Guard Match
/// The `#if !defined(X) ... #define Y` region of a header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardMatch {
    /// Byte range of the whole region, from `#if` to the end of the last
    /// `#define` token.
    pub region: Range<usize>,
    /// Byte range of `X` inside `defined(...)`.
    pub guard: Range<usize>,
}

fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn skip_while(text: &str, pos: usize, pred: impl Fn(char) -> bool) -> usize {
    text[pos..]
        .char_indices()
        .find(|&(_, c)| !pred(c))
        .map(|(offset, _)| pos + offset)
        .unwrap_or(text.len())
}

fn skip_whitespace(text: &str, pos: usize) -> usize {
    skip_while(text, pos, char::is_whitespace)
}

fn skip_word(text: &str, pos: usize) -> usize {
    skip_while(text, pos, is_word)
}

/// `#if` + ws + `!defined` + ws? + `(` word `)`, returns the word range and
/// the position after `)`.
fn match_condition(text: &str, start: usize) -> Option<(Range<usize>, usize)> {
    let pos = start + IF_DIRECTIVE.len();
    let after_ws = skip_whitespace(text, pos);
    if after_ws == pos || !text[after_ws..].starts_with(DEFINED) {
        return None;
    }

    let pos = skip_whitespace(text, after_ws + DEFINED.len());
    if !text[pos..].starts_with('(') {
        return None;
    }

    let word_start = pos + 1;
    let word_end = skip_word(text, word_start);
    if word_end == word_start || !text[word_end..].starts_with(')') {
        return None;
    }

    Some((word_start..word_end, word_end + 1))
}

/// `#define` + ws + word, starting right after `#define`. Returns the end of
/// the word.
fn match_define(text: &str, pos: usize) -> Option<usize> {
    let after_ws = skip_whitespace(text, pos);
    if after_ws == pos {
        return None;
    }

    let word_end = skip_word(text, after_ws);
    (word_end != after_ws).then_some(word_end)
}

/// Find the include guard of `text`.
///
/// The first `#if !defined(X)` wins. The region is greedy: it runs to the
/// last line starting with `#define <word>` anywhere after the condition.
/// If that first condition has no such line after it, no later one can
/// either, so there is no match.
pub fn find_guard(text: &str) -> Option<GuardMatch> {
    let (region_start, guard, condition_end) =
        text.match_indices(IF_DIRECTIVE).find_map(|(start, _)| {
            let (guard, condition_end) = match_condition(text, start)?;
            Some((start, guard, condition_end))
        })?;

    let region_end = text[condition_end..]
        .match_indices(DEFINE_LINE)
        .filter_map(|(offset, _)| match_define(text, condition_end + offset + DEFINE_LINE.len()))
        .last()?;

    Some(GuardMatch {
        region: region_start..region_end,
        guard,
    })
}

/// Find the first `#endif // <guard>` comment. The token only has to prefix
/// the comment text.
pub fn find_endif_comment(text: &str, guard: &str) -> Option<Range<usize>> {
    text.match_indices(ENDIF_DIRECTIVE).find_map(|(start, _)| {
        let pos = start + ENDIF_DIRECTIVE.len();
        let after_ws = skip_whitespace(text, pos);
        if after_ws == pos || !text[after_ws..].starts_with(LINE_COMMENT) {
            return None;
        }

        let token_start = skip_whitespace(text, after_ws + LINE_COMMENT.len());
        text[token_start..]
            .starts_with(guard)
            .then_some(start..token_start + guard.len())
    })
}
