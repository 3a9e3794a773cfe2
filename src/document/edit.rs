//! Text editing operations.
//!
//! Every operation leaves the run invariant intact: at least one run, and
//! run lengths summing to the character count.

use regex::Regex;

use crate::error::{LbxError, Result};

use super::types::{FontInfo, StyleRun, Text};

impl Text {
    /// Replace the whole content, rescaling run lengths proportionally.
    /// Rounding remainders go to the last run.
    pub fn set_content(&mut self, content: impl Into<String>) {
        let content = content.into();
        let new_len = content.chars().count();
        let old_len = self.char_len();
        self.content = content;

        let n = self.runs.len();
        if n == 1 || old_len == 0 {
            for run in &mut self.runs {
                run.len = 0;
            }
            if let Some(last) = self.runs.last_mut() {
                last.len = new_len;
            }
        } else {
            let scale = new_len as f64 / old_len as f64;
            let mut cumulative = 0usize;
            let mut previous = 0usize;
            for (i, run) in self.runs.iter_mut().enumerate() {
                cumulative += run.len;
                let boundary = if i + 1 == n {
                    new_len
                } else {
                    ((cumulative as f64 * scale).round() as usize).clamp(previous, new_len)
                };
                run.len = boundary - previous;
                previous = boundary;
            }
        }
        self.drop_empty_runs();
    }

    /// Find and replace. Replacement characters take the style of the run
    /// the match starts in. Returns the number of replacements.
    pub fn replace(&mut self, find: &str, replacement: &str, ignore_case: bool) -> usize {
        let needle: Vec<char> = find.chars().collect();
        if needle.is_empty() {
            return 0;
        }
        let chars: Vec<char> = self.content.chars().collect();
        let owners = self.char_owners();
        let same = |a: char, b: char| {
            if ignore_case {
                a == b || a.to_lowercase().eq(b.to_lowercase())
            } else {
                a == b
            }
        };

        let mut out = String::with_capacity(self.content.len());
        let mut out_owners = Vec::with_capacity(owners.len());
        let mut count = 0;
        let mut i = 0;
        while i < chars.len() {
            let is_match = i + needle.len() <= chars.len()
                && needle.iter().zip(&chars[i..]).all(|(&n, &c)| same(n, c));
            if is_match {
                for ch in replacement.chars() {
                    out.push(ch);
                    out_owners.push(owners[i]);
                }
                i += needle.len();
                count += 1;
            } else {
                out.push(chars[i]);
                out_owners.push(owners[i]);
                i += 1;
            }
        }

        if count > 0 {
            let fallback = owners.first().copied().unwrap_or(0);
            self.content = out;
            self.rebuild_runs(&out_owners, fallback);
        }
        count
    }

    /// Regex find and replace. `replacement` may use `$1`/`${name}` group
    /// references. Replacement characters take the style of the run the
    /// match starts in. Returns the number of replacements.
    pub fn replace_regex(&mut self, pattern: &Regex, replacement: &str) -> usize {
        let owners = self.char_owners();
        let owner_at = |i: usize| owners.get(i).or(owners.last()).copied().unwrap_or(0);

        let mut out = String::with_capacity(self.content.len());
        let mut out_owners = Vec::with_capacity(owners.len());
        let mut count = 0;
        let mut byte = 0;
        let mut char_index = 0;
        for caps in pattern.captures_iter(&self.content) {
            let Some(m) = caps.get(0) else {
                continue;
            };
            for ch in self.content[byte..m.start()].chars() {
                out.push(ch);
                out_owners.push(owner_at(char_index));
                char_index += 1;
            }
            let owner = owner_at(char_index);
            let mut expanded = String::new();
            caps.expand(replacement, &mut expanded);
            for ch in expanded.chars() {
                out.push(ch);
                out_owners.push(owner);
            }
            char_index += m.as_str().chars().count();
            byte = m.end();
            count += 1;
        }
        if count == 0 {
            return 0;
        }
        for ch in self.content[byte..].chars() {
            out.push(ch);
            out_owners.push(owner_at(char_index));
            char_index += 1;
        }

        let fallback = owners.first().copied().unwrap_or(0);
        self.content = out;
        self.rebuild_runs(&out_owners, fallback);
        count
    }

    /// Split run `index` into two runs at character offset `at` within it.
    pub fn split_run(&mut self, index: usize, at: usize) -> Result<()> {
        let run = self.run_checked(index)?;
        if at == 0 || at >= run.len {
            return Err(LbxError::InvalidEdit(format!(
                "split position {at} must be inside run {index} of length {}",
                run.len
            )));
        }
        let mut tail = run.clone();
        tail.len = run.len - at;
        self.runs[index].len = at;
        self.runs.insert(index + 1, tail);
        Ok(())
    }

    /// Merge runs `start..=end` into one run carrying the first run's style.
    pub fn merge_runs(&mut self, start: usize, end: usize) -> Result<()> {
        if start >= end || end >= self.runs.len() {
            return Err(LbxError::InvalidEdit(format!(
                "cannot merge runs {start}..={end} of {}",
                self.runs.len()
            )));
        }
        let total: usize = self.runs[start..=end].iter().map(|r| r.len).sum();
        self.runs.drain(start + 1..=end);
        self.runs[start].len = total;
        Ok(())
    }

    /// Remove run `index` together with the characters it covers.
    pub fn delete_run(&mut self, index: usize) -> Result<()> {
        self.run_checked(index)?;
        let (range, _) = self
            .run_spans()
            .nth(index)
            .ok_or_else(|| LbxError::InvalidEdit(format!("run {index} does not exist")))?;
        self.content = self
            .content
            .chars()
            .enumerate()
            .filter(|(i, _)| !range.contains(i))
            .map(|(_, c)| c)
            .collect();
        if self.runs.len() == 1 {
            self.runs[0].len = 0;
        } else {
            self.runs.remove(index);
        }
        Ok(())
    }

    /// Insert `text` as a new run before run `position`, or append when
    /// `position` is `None`.
    pub fn insert_run(&mut self, text: &str, font: FontInfo, position: Option<usize>) -> Result<()> {
        let position = position.unwrap_or(self.runs.len());
        if position > self.runs.len() {
            return Err(LbxError::InvalidEdit(format!(
                "run position {position} is past the last run ({})",
                self.runs.len()
            )));
        }
        let char_start: usize = self.runs[..position].iter().map(|r| r.len).sum();
        let byte_start = self
            .content
            .char_indices()
            .nth(char_start)
            .map(|(b, _)| b)
            .unwrap_or(self.content.len());
        self.content.insert_str(byte_start, text);
        self.runs
            .insert(position, StyleRun::new(text.chars().count(), font));
        self.drop_empty_runs();
        Ok(())
    }

    /// Change the font of one run.
    pub fn set_run_font(&mut self, index: usize, font: FontInfo) -> Result<()> {
        self.run_checked(index)?;
        self.runs[index].font = font;
        Ok(())
    }

    fn run_checked(&self, index: usize) -> Result<&StyleRun> {
        self.runs.get(index).ok_or_else(|| {
            LbxError::InvalidEdit(format!(
                "run {index} does not exist ({} runs)",
                self.runs.len()
            ))
        })
    }

    /// Index of the owning run for every character.
    fn char_owners(&self) -> Vec<usize> {
        self.runs
            .iter()
            .enumerate()
            .flat_map(|(i, r)| std::iter::repeat_n(i, r.len))
            .collect()
    }

    /// Rebuild runs from per-character owners, grouping consecutive equal owners.
    fn rebuild_runs(&mut self, owners: &[usize], fallback: usize) {
        let mut runs: Vec<StyleRun> = Vec::new();
        let mut last_owner = None;
        for &owner in owners {
            match runs.last_mut() {
                Some(run) if last_owner == Some(owner) => run.len += 1,
                _ => {
                    let mut run = self.runs[owner].clone();
                    run.len = 1;
                    runs.push(run);
                    last_owner = Some(owner);
                }
            }
        }
        if runs.is_empty() {
            let mut run = self.runs[fallback].clone();
            run.len = 0;
            runs.push(run);
        }
        self.runs = runs;
    }

    /// Remove zero-length runs, keeping at least one.
    fn drop_empty_runs(&mut self) {
        if self.runs.iter().all(|r| r.len == 0) {
            self.runs.truncate(1);
            return;
        }
        self.runs.retain(|r| r.len > 0);
    }
}
