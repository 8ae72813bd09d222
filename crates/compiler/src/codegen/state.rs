//! Code generator state: the assembly output buffer, the simulated
//! stack frame, the string-literal pool, and label allocation.
//!
//! Grounded on `codegen.c`'s `asm_push`/`asm_push_args` (buffered
//! `vfprintf`-style emission) and spec §4.7's label-naming scheme
//! (`endc_N`/`endc_N_positive` for short-circuit boolean operators).

use rcc_core::{SimulatedStackFrame, WORD_SIZE};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct CodegenState {
    data_section: String,
    text_section: String,
    rodata_section: String,
    pub frame: SimulatedStackFrame,
    /// Interned string literals: text -> label. `intern` returns the
    /// same label for equal text, matching spec §8's string-interning
    /// scenario (`"hi"` used twice emits one `.rodata` entry).
    string_pool: HashMap<String, String>,
    label_counter: usize,
    /// name -> ebp-relative offset, valid for the function currently
    /// being generated.
    pub locals: HashMap<String, isize>,
    pub next_local_offset: isize,
}

impl CodegenState {
    pub fn new() -> Self {
        CodegenState::default()
    }

    pub fn emit_data(&mut self, line: impl AsRef<str>) {
        self.data_section.push_str(line.as_ref());
        self.data_section.push('\n');
    }

    pub fn emit_text(&mut self, line: impl AsRef<str>) {
        self.text_section.push_str(line.as_ref());
        self.text_section.push('\n');
    }

    pub fn emit_rodata(&mut self, line: impl AsRef<str>) {
        self.rodata_section.push_str(line.as_ref());
        self.rodata_section.push('\n');
    }

    /// `asm_push`-equivalent instruction emission with consistent
    /// indentation, used for every instruction except labels.
    pub fn instr(&mut self, text: impl AsRef<str>) {
        self.emit_text(format!("    {}", text.as_ref()));
    }

    pub fn label(&mut self, name: impl AsRef<str>) {
        self.emit_text(format!("{}:", name.as_ref()));
    }

    /// Fresh numbered label for short-circuit `&&`/`||` codegen
    /// (`endc_N`) and other control-flow join points.
    pub fn new_label(&mut self, prefix: &str) -> String {
        let n = self.label_counter;
        self.label_counter += 1;
        format!("{prefix}_{n}")
    }

    /// Interns a string literal, returning its `.rodata` label. Equal
    /// text always returns the same label.
    pub fn intern_string(&mut self, text: &str) -> String {
        if let Some(label) = self.string_pool.get(text) {
            return label.clone();
        }
        let label = format!("str_{}", self.string_pool.len());
        let escaped = escape_nasm_string(text);
        self.emit_rodata(format!("{label}: db {escaped}, 0"));
        self.string_pool.insert(text.to_string(), label.clone());
        label
    }

    pub fn reserve_local(&mut self, name: &str, size: usize) -> isize {
        self.next_local_offset -= size.max(WORD_SIZE) as isize;
        self.locals.insert(name.to_string(), self.next_local_offset);
        self.next_local_offset
    }

    /// Assembles `.data` / `.text` / `.rodata` in that order, matching
    /// `codegen.c`'s section emission sequence.
    pub fn finish(self) -> String {
        let mut out = String::new();
        out.push_str("section .data\n");
        out.push_str(&self.data_section);
        out.push_str("section .text\n");
        out.push_str(&self.text_section);
        out.push_str("section .rodata\n");
        out.push_str(&self.rodata_section);
        out
    }
}

fn escape_nasm_string(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_same_text_returns_same_label() {
        let mut state = CodegenState::new();
        let a = state.intern_string("hi");
        let b = state.intern_string("hi");
        assert_eq!(a, b);
        assert_eq!(state.finish().matches("str_0").count(), 1);
    }

    #[test]
    fn distinct_strings_get_distinct_labels() {
        let mut state = CodegenState::new();
        let a = state.intern_string("hi");
        let b = state.intern_string("bye");
        assert_ne!(a, b);
    }

    #[test]
    fn sections_emit_in_data_text_rodata_order() {
        let mut state = CodegenState::new();
        state.emit_data("x: dd 0");
        state.instr("mov eax, 1");
        state.intern_string("s");
        let asm = state.finish();
        let data_pos = asm.find("section .data").unwrap();
        let text_pos = asm.find("section .text").unwrap();
        let rodata_pos = asm.find("section .rodata").unwrap();
        assert!(data_pos < text_pos && text_pos < rodata_pos);
    }

    #[test]
    fn new_label_numbers_increment() {
        let mut state = CodegenState::new();
        assert_eq!(state.new_label("endc"), "endc_0");
        assert_eq!(state.new_label("endc"), "endc_1");
    }
}
