use super::view::AnalysisView;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::time::Duration;

/// Appended to the partial response while more text may follow.
pub const CURSOR: char = '_';

pub const MIN_GROUP: usize = 5;
pub const MAX_GROUP: usize = 10;

pub fn with_cursor(text: &str) -> String {
    let mut shown = String::with_capacity(text.len() + 1);
    shown.push_str(text);
    shown.push(CURSOR);
    shown
}

/// Response text accumulated in arrival order.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    text: String,
    chars: usize,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ch: char) {
        self.text.push(ch);
        self.chars += 1;
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn char_count(&self) -> usize {
        self.chars
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Freezes the buffer into the final response.
    pub fn finish(self) -> String {
        self.text
    }
}

/// Cosmetic reveal of text that has already arrived: after every K characters
/// (K uniform in [MIN_GROUP, MAX_GROUP]) it pauses and redraws the partial view.
pub struct Typewriter {
    rng: StdRng,
    delay: Duration,
}

impl Typewriter {
    pub fn new(delay: Duration) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            delay,
        }
    }

    pub fn seeded(delay: Duration, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            delay,
        }
    }

    fn next_group(&mut self) -> usize {
        self.rng.gen_range(MIN_GROUP..=MAX_GROUP)
    }

    /// Appends `fragment` to `buffer`, redrawing the view after each group.
    /// The group counter restarts with every fragment. Returns the number of
    /// redraws made.
    pub async fn reveal(
        &mut self,
        fragment: &str,
        buffer: &mut ResponseBuffer,
        view: &mut dyn AnalysisView,
    ) -> usize {
        let mut redraws = 0;
        let mut count = 0;
        let mut group = self.next_group();

        for ch in fragment.chars() {
            buffer.push(ch);
            count += 1;
            if count == group {
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                view.partial(&with_cursor(buffer.as_str()));
                redraws += 1;
                count = 0;
                group = self.next_group();
            }
        }

        redraws
    }
}
