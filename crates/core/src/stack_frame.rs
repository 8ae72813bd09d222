//! The simulated stack frame (spec §4.6 / C6).
//!
//! The code generator never trusts its own bookkeeping of what the
//! emitted assembly has pushed; instead it mirrors every `push`/`pop`
//! it emits onto this model, matching the original's internal
//! push/pop tracking. A mismatch (`pop_expecting` seeing the wrong
//! element) means the code generator itself has a bug, not that the
//! input program is invalid, so it panics rather than returning a
//! `Result` — spec §7's "compiler bug" policy.

use crate::datatype::Datatype;

/// What a single simulated stack slot holds.
#[derive(Debug, Clone)]
pub enum StackElement {
    /// A local variable's storage, named for diagnostics.
    Local { name: String, datatype: Datatype },
    /// A callee-saved register pushed around a call or block.
    SavedRegister(&'static str),
    /// The saved `ebp` pushed by the function prologue.
    SavedBasePointer,
    /// An intermediate value pushed by expression codegen (e.g. a
    /// partial result awaiting its sibling operand).
    PushedValue { datatype: Datatype },
    /// Anything the frame doesn't name more specifically; still takes
    /// up exactly one word like every other element.
    Unknown,
}

impl StackElement {
    fn matches_expectation(&self, expect: &StackElement) -> bool {
        matches!(
            (self, expect),
            (StackElement::Local { .. }, StackElement::Local { .. })
                | (StackElement::SavedRegister(_), StackElement::SavedRegister(_))
                | (StackElement::SavedBasePointer, StackElement::SavedBasePointer)
                | (StackElement::PushedValue { .. }, StackElement::PushedValue { .. })
                | (StackElement::Unknown, StackElement::Unknown)
        )
    }
}

/// One entry in the simulated frame: the element plus the `ebp`-relative
/// byte offset it lives at.
#[derive(Debug, Clone)]
pub struct FrameEntry {
    pub element: StackElement,
    pub offset: isize,
}

/// Mirrors the emitted assembly's stack usage one word at a time.
/// `offset` tracks the running total exactly the way the real `esp`
/// would move, so the resolver/codegen can ask "what's the `ebp`-relative
/// offset of the next push" without re-deriving it from scratch.
#[derive(Debug, Default)]
pub struct SimulatedStackFrame {
    entries: Vec<FrameEntry>,
    offset: isize,
}

impl SimulatedStackFrame {
    pub fn new() -> Self {
        SimulatedStackFrame {
            entries: Vec::new(),
            offset: 0,
        }
    }

    pub fn current_offset(&self) -> isize {
        self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `asm_stack_frame_push`-equivalent: records one word pushed.
    /// The frame grows downward, matching x86 `push`.
    pub fn push(&mut self, element: StackElement) -> isize {
        self.offset -= crate::datatype::WORD_SIZE as isize;
        self.entries.push(FrameEntry {
            element,
            offset: self.offset,
        });
        self.offset
    }

    /// Unconditional pop, used when the caller doesn't need to assert
    /// the popped element's shape (e.g. discarding a scratch push).
    pub fn pop(&mut self) -> Option<FrameEntry> {
        let entry = self.entries.pop();
        if entry.is_some() {
            self.offset += crate::datatype::WORD_SIZE as isize;
        }
        entry
    }

    /// `pop_expecting`: pops and asserts the popped element has the
    /// same shape as `expect`. Panics on mismatch — a compiler-internal
    /// invariant violation, not a user-facing error.
    pub fn pop_expecting(&mut self, expect: &StackElement) -> FrameEntry {
        let entry = self
            .entries
            .pop()
            .unwrap_or_else(|| panic!("simulated stack frame underflow: expected {:?} but frame was empty", expect));
        if !entry.element.matches_expectation(expect) {
            panic!(
                "simulated stack frame mismatch: expected {:?}, found {:?}",
                expect, entry.element
            );
        }
        self.offset += crate::datatype::WORD_SIZE as isize;
        entry
    }

    /// Simulates an `add esp, n` / `sub esp, n` that doesn't correspond
    /// to individual pushes/pops (e.g. reserving space for locals in
    /// the prologue in one instruction).
    pub fn sub(&mut self, bytes: isize) {
        self.offset -= bytes;
    }

    pub fn add(&mut self, bytes: isize) {
        self.offset += bytes;
    }

    /// Called at `ret` codegen: the frame must be perfectly unwound,
    /// matching the original's assertion that the simulated stack is
    /// empty when a function returns.
    pub fn assert_empty_at_return(&self) {
        assert!(
            self.entries.is_empty(),
            "simulated stack frame not empty at function return: {} entries remain",
            self.entries.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::PrimitiveKind;

    #[test]
    fn push_pop_round_trip_restores_offset() {
        let mut frame = SimulatedStackFrame::new();
        let start = frame.current_offset();
        frame.push(StackElement::PushedValue {
            datatype: Datatype::new(PrimitiveKind::Int),
        });
        frame.pop_expecting(&StackElement::PushedValue {
            datatype: Datatype::new(PrimitiveKind::Int),
        });
        assert_eq!(frame.current_offset(), start);
        assert!(frame.is_empty());
    }

    #[test]
    #[should_panic(expected = "mismatch")]
    fn pop_expecting_panics_on_shape_mismatch() {
        let mut frame = SimulatedStackFrame::new();
        frame.push(StackElement::SavedBasePointer);
        frame.pop_expecting(&StackElement::SavedRegister("ebx"));
    }

    #[test]
    #[should_panic(expected = "not empty")]
    fn assert_empty_panics_when_frame_has_leftovers() {
        let mut frame = SimulatedStackFrame::new();
        frame.push(StackElement::Unknown);
        frame.assert_empty_at_return();
    }

    #[test]
    fn offsets_grow_downward_by_word_size() {
        let mut frame = SimulatedStackFrame::new();
        let a = frame.push(StackElement::Unknown);
        let b = frame.push(StackElement::Unknown);
        assert_eq!(a - b, 4);
    }
}
