//! Typing animation for assistant replies.
//!
//! Replies are revealed a few characters per tick instead of appearing all at
//! once. The controller tracks at most one animating message; everything else
//! renders in full. Once a message has finished animating it is remembered by
//! id, so re-rendering or reloading the same transcript never replays the
//! animation.

use std::collections::HashSet;
use std::time::Duration;

/// Cadence of reveal ticks while an animation is running.
pub const REVEAL_TICK: Duration = Duration::from_millis(8);

/// Characters uncovered per tick.
pub const CHARS_PER_TICK: usize = 3;

/// Replies at or above this length (in chars) skip the animation entirely.
pub const AUTO_COMPLETE_THRESHOLD: usize = 3000;

/// Tracks the typing animation for the transcript.
///
/// At most one message animates at a time. Starting a new animation finalizes
/// the previous one. Completion is sticky per message id.
#[derive(Debug, Default)]
pub struct RevealController {
    active: Option<ActiveReveal>,
    completed: HashSet<String>,
}

#[derive(Debug)]
struct ActiveReveal {
    message_id: String,
    total_chars: usize,
    shown_chars: usize,
}

impl RevealController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begins animating `text` for the given message.
    ///
    /// Any animation already in progress is finalized first. Messages that
    /// already completed, or that exceed the auto-complete threshold, are
    /// shown in full immediately.
    pub fn start(&mut self, message_id: &str, text: &str) {
        self.finish_active();

        if self.completed.contains(message_id) {
            return;
        }

        let total_chars = text.chars().count();
        if total_chars == 0 || total_chars >= AUTO_COMPLETE_THRESHOLD {
            self.completed.insert(message_id.to_string());
            return;
        }

        self.active = Some(ActiveReveal {
            message_id: message_id.to_string(),
            total_chars,
            shown_chars: 0,
        });
    }

    /// Advances the animation by one tick.
    ///
    /// Returns true when the visible portion changed and a redraw is needed.
    pub fn tick(&mut self) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };

        active.shown_chars = (active.shown_chars + CHARS_PER_TICK).min(active.total_chars);
        if active.shown_chars >= active.total_chars {
            self.finish_active();
        }
        true
    }

    /// True while a message is still animating.
    pub fn is_animating(&self) -> bool {
        self.active.is_some()
    }

    /// Finalizes the current animation, if any (used to skip to full text).
    pub fn complete_active(&mut self) {
        self.finish_active();
    }

    /// Returns the portion of `text` that should be visible for `message_id`.
    ///
    /// Only the actively animating message is truncated; everything else is
    /// shown in full. The cut always lands on a char boundary.
    pub fn visible_prefix<'a>(&self, message_id: &str, text: &'a str) -> &'a str {
        match &self.active {
            Some(active) if active.message_id == message_id => {
                match text.char_indices().nth(active.shown_chars) {
                    Some((byte_idx, _)) => &text[..byte_idx],
                    None => text,
                }
            }
            _ => text,
        }
    }

    /// Drops completion tracking for a removed message.
    pub fn forget(&mut self, message_id: &str) {
        if let Some(active) = &self.active
            && active.message_id == message_id
        {
            self.active = None;
        }
        self.completed.remove(message_id);
    }

    /// Clears all animation state (session switch or reset).
    pub fn reset(&mut self) {
        self.active = None;
        self.completed.clear();
    }

    fn finish_active(&mut self) {
        if let Some(active) = self.active.take() {
            self.completed.insert(active.message_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reveals_in_char_increments() {
        let mut reveal = RevealController::new();
        let text = "abcdefghij";
        reveal.start("m1", text);

        assert_eq!(reveal.visible_prefix("m1", text), "");
        reveal.tick();
        assert_eq!(reveal.visible_prefix("m1", text), "abc");
        reveal.tick();
        assert_eq!(reveal.visible_prefix("m1", text), "abcdef");
    }

    #[test]
    fn finishes_in_ceil_ticks() {
        let mut reveal = RevealController::new();
        for len in [1usize, 2, 3, 4, 10, 100, 2999] {
            let text: String = "x".repeat(len);
            let id = format!("m-{len}");
            reveal.start(&id, &text);

            let mut ticks = 0;
            while reveal.is_animating() {
                reveal.tick();
                ticks += 1;
                assert!(ticks <= len, "runaway animation for len {len}");
            }
            assert_eq!(ticks, len.div_ceil(CHARS_PER_TICK), "len {len}");
            assert_eq!(reveal.visible_prefix(&id, &text), text);
        }
    }

    #[test]
    fn prefix_never_splits_multibyte_chars() {
        let mut reveal = RevealController::new();
        let text = "héllo wörld 日本語テスト";
        reveal.start("m1", text);

        let mut last_len = 0;
        while reveal.is_animating() {
            reveal.tick();
            let prefix = reveal.visible_prefix("m1", text);
            assert!(text.starts_with(prefix));
            assert!(prefix.len() >= last_len, "visible portion shrank");
            last_len = prefix.len();
        }
        assert_eq!(reveal.visible_prefix("m1", text), text);
    }

    #[test]
    fn long_replies_skip_the_animation() {
        let mut reveal = RevealController::new();
        let text = "y".repeat(AUTO_COMPLETE_THRESHOLD);
        reveal.start("long", &text);

        assert!(!reveal.is_animating());
        assert_eq!(reveal.visible_prefix("long", &text), text);
    }

    #[test]
    fn completion_is_sticky_per_message() {
        let mut reveal = RevealController::new();
        reveal.start("m1", "hello there");
        while reveal.is_animating() {
            reveal.tick();
        }

        // Re-starting a finished message must not animate again.
        reveal.start("m1", "hello there");
        assert!(!reveal.is_animating());
        assert_eq!(reveal.visible_prefix("m1", "hello there"), "hello there");
    }

    #[test]
    fn starting_a_new_message_finalizes_the_previous_one() {
        let mut reveal = RevealController::new();
        reveal.start("m1", "first reply text");
        reveal.tick();

        reveal.start("m2", "second reply");
        assert_eq!(reveal.visible_prefix("m1", "first reply text"), "first reply text");
        assert_eq!(reveal.visible_prefix("m2", "second reply"), "");

        // And m1 stays complete.
        reveal.start("m1", "first reply text");
        assert!(!reveal.is_animating());
    }

    #[test]
    fn skip_jumps_to_full_text() {
        let mut reveal = RevealController::new();
        reveal.start("m1", "some reply worth skipping");
        reveal.tick();
        reveal.complete_active();

        assert!(!reveal.is_animating());
        assert_eq!(
            reveal.visible_prefix("m1", "some reply worth skipping"),
            "some reply worth skipping"
        );
    }

    #[test]
    fn forget_allows_reanimation_reset_clears_everything() {
        let mut reveal = RevealController::new();
        reveal.start("m1", "abc");
        while reveal.is_animating() {
            reveal.tick();
        }

        reveal.forget("m1");
        reveal.start("m1", "abc");
        assert!(reveal.is_animating());

        reveal.reset();
        assert!(!reveal.is_animating());
        reveal.start("m1", "abc");
        assert!(reveal.is_animating());
    }

    #[test]
    fn empty_text_completes_immediately() {
        let mut reveal = RevealController::new();
        reveal.start("m1", "");
        assert!(!reveal.is_animating());
    }
}
