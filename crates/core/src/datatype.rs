//! The datatype model (spec §3, §4.1 / C1).
//!
//! Grounded on `datatype.c` and `compiler.h` from the original compiler:
//! `datatype_size`, `datatype_element_size`, `datatype_size_no_ptr`,
//! `datatype_size_for_array_access`, `datatype_pointer_reduce`, and
//! `datatype_thats_a_pointer` are carried over with the same names
//! (translated to idiomatic `snake_case` methods) and the same edge
//! cases.

/// Machine word size for this target: 4 bytes (32-bit x86).
pub const WORD_SIZE: usize = 4;

/// Primitive datatype kinds (`DATA_TYPE_*` in the original).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Void,
    Char,
    Short,
    Int,
    Long,
    Struct,
    Union,
    Unknown,
}

impl PrimitiveKind {
    /// Natural size in bytes, ignoring pointer/array modifiers.
    pub fn base_size(self) -> usize {
        match self {
            PrimitiveKind::Void => 0,
            PrimitiveKind::Char => 1,
            PrimitiveKind::Short => 2,
            PrimitiveKind::Int => 4,
            PrimitiveKind::Long => 4,
            PrimitiveKind::Struct | PrimitiveKind::Union => 0,
            PrimitiveKind::Unknown => 0,
        }
    }
}

/// One `[n]` bracket in an array declarator. `size` is `None` for an
/// incomplete outer dimension (`int a[][4]`), which is only legal as
/// the first bracket and only when the array has an initializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArrayBracket {
    pub size: Option<usize>,
}

/// A full datatype: primitive kind, optional struct/union back-reference,
/// pointer depth, array brackets, and the qualifier flags named in spec §3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datatype {
    pub kind: PrimitiveKind,
    /// Name of the backing struct/union definition, if any. A
    /// non-owning reference by name only (see DESIGN.md note on
    /// back-references): the actual definition lives in the struct
    /// offset table owned by the resolver process.
    pub struct_name: Option<String>,
    pub pointer_depth: u8,
    pub is_pointer: bool,
    pub brackets: Vec<ArrayBracket>,
    pub signed: bool,
    pub is_const: bool,
    pub is_static: bool,
    pub is_extern: bool,
    pub is_literal: bool,
    /// `struct {} ;` / `union {} ;` with no tag name.
    pub is_anonymous_struct_or_union: bool,
    /// Size of the backing struct/union, patched in once the struct
    /// offset table is built. `None` for primitives.
    struct_size: Option<usize>,
}

impl Datatype {
    pub fn new(kind: PrimitiveKind) -> Self {
        Datatype {
            kind,
            struct_name: None,
            pointer_depth: 0,
            is_pointer: false,
            brackets: Vec::new(),
            signed: true,
            is_const: false,
            is_static: false,
            is_extern: false,
            is_literal: false,
            is_anonymous_struct_or_union: false,
            struct_size: None,
        }
    }

    /// `datatype_for_numeric()`: the implicit type of an integer literal.
    pub fn literal_int() -> Self {
        let mut dt = Datatype::new(PrimitiveKind::Int);
        dt.is_literal = true;
        dt
    }

    pub fn pointer_to(kind: PrimitiveKind, depth: u8) -> Self {
        let mut dt = Datatype::new(kind);
        dt.pointer_depth = depth;
        dt.is_pointer = depth > 0;
        dt
    }

    fn is_array(&self) -> bool {
        !self.brackets.is_empty()
    }

    /// `datatype_is_struct_or_union`.
    pub fn is_struct_or_union(&self) -> bool {
        matches!(self.kind, PrimitiveKind::Struct | PrimitiveKind::Union)
    }

    /// `datatype_is_primitive`.
    pub fn is_primitive(&self) -> bool {
        !self.is_struct_or_union()
    }

    /// `datatype_is_struct_or_union_no_pointer`.
    pub fn is_struct_or_union_not_pointer(&self) -> bool {
        self.kind != PrimitiveKind::Unknown && !self.is_primitive() && !self.is_pointer
    }

    /// Product of every declared dimension's size, or `0` if any
    /// dimension is still incomplete (caller must supply it first).
    fn array_total_elements(&self) -> usize {
        self.brackets
            .iter()
            .map(|b| b.size.unwrap_or(0))
            .product()
    }

    /// `datatype_size_no_ptr`: ignores the pointer flag, used when the
    /// caller already knows it wants the underlying aggregate size
    /// (e.g. a struct global's `.data` allocation).
    pub fn size_no_ptr(&self) -> usize {
        if self.is_array() {
            return self.array_total_elements() * self.kind.base_size().max(self.struct_size_hint());
        }
        self.kind.base_size().max(self.struct_size_hint())
    }

    /// Size of the named struct/union, when known. Structs report 0
    /// from `base_size`; callers that own a struct-offset table patch
    /// this in via `with_struct_size`. Stored inline here because
    /// `Datatype` has no back-reference to the table (see DESIGN.md).
    fn struct_size_hint(&self) -> usize {
        self.struct_size.unwrap_or(0)
    }

    /// `datatype_size`: the canonical size used for stack allocation
    /// and `sizeof`. Pointers are always word-sized regardless of what
    /// they point to; arrays are element-size * dimension product. The
    /// array check runs first so `int *p[3]` (an array of 3 pointers)
    /// sizes as 3 words, not 1 — `is_pointer` describes the *element*
    /// type there, not `p` itself.
    pub fn size(&self) -> usize {
        if self.is_array() {
            return self.array_total_elements() * self.element_size();
        }
        if self.is_pointer && self.pointer_depth > 0 {
            return WORD_SIZE;
        }
        self.kind.base_size().max(self.struct_size_hint())
    }

    /// `datatype_element_size`: a pointer always counts as a word,
    /// used when aggregating function-call argument stack space.
    pub fn element_size(&self) -> usize {
        if self.is_pointer {
            return WORD_SIZE;
        }
        self.kind.base_size().max(self.struct_size_hint())
    }

    /// `datatype_size_for_array_access`: the struct/union pointer edge
    /// case — `struct abc *p; p[0];` yields the struct's own size, not
    /// the word size, because the bracket dereferences the pointer.
    pub fn size_for_array_access(&self) -> usize {
        if self.is_struct_or_union() && self.is_pointer && self.pointer_depth == 1 {
            return self.struct_size_hint();
        }
        self.size()
    }

    /// `datatype_pointer_reduce`: a copy with pointer depth decremented
    /// by `by`, clearing the pointer flag once depth reaches zero.
    pub fn pointer_reduce(&self, by: u8) -> Datatype {
        let mut copy = self.clone();
        copy.pointer_depth = copy.pointer_depth.saturating_sub(by);
        if copy.pointer_depth == 0 {
            copy.is_pointer = false;
        }
        copy
    }

    pub fn decrement_pointer(&mut self) {
        if self.pointer_depth > 0 {
            self.pointer_depth -= 1;
        }
        if self.pointer_depth == 0 {
            self.is_pointer = false;
        }
    }

    /// Patches in the backing struct/union size once the struct offset
    /// table has computed it (structs can only self-reference through
    /// a pointer, so this never needs to observe a half-built table).
    pub fn with_struct_size(mut self, size: usize) -> Self {
        self.struct_size = Some(size);
        self
    }

    /// In-place form of `with_struct_size`, for patching a `Datatype`
    /// that's already stored in a field/local/arg table rather than
    /// being built fresh.
    pub fn set_struct_size(&mut self, size: usize) {
        self.struct_size = Some(size);
    }
}

/// `datatype_thats_a_pointer`: returns whichever operand is a pointer,
/// or `None` if neither (or both — caller picks `d1` first, matching
/// the original's left-operand-first check).
pub fn pointer_operand<'a>(d1: &'a Datatype, d2: &'a Datatype) -> Option<&'a Datatype> {
    if d1.is_pointer {
        return Some(d1);
    }
    if d2.is_pointer {
        return Some(d2);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_size_is_always_word_sized() {
        let dt = Datatype::pointer_to(PrimitiveKind::Struct, 1).with_struct_size(64);
        assert_eq!(dt.size(), WORD_SIZE);
        assert_eq!(dt.element_size(), WORD_SIZE);
    }

    #[test]
    fn pointer_to_struct_depth_one_uses_struct_size_for_array_access() {
        let dt = Datatype::pointer_to(PrimitiveKind::Struct, 1).with_struct_size(12);
        assert_eq!(dt.size_for_array_access(), 12);
    }

    #[test]
    fn array_size_is_element_times_dimensions() {
        let mut dt = Datatype::new(PrimitiveKind::Int);
        dt.brackets.push(ArrayBracket { size: Some(3) });
        dt.brackets.push(ArrayBracket { size: Some(4) });
        assert_eq!(dt.size(), 4 * 3 * 4);
    }

    #[test]
    fn pointer_reduce_clears_flag_at_zero() {
        let dt = Datatype::pointer_to(PrimitiveKind::Int, 1);
        let reduced = dt.pointer_reduce(1);
        assert_eq!(reduced.pointer_depth, 0);
        assert!(!reduced.is_pointer);
    }

    #[test]
    fn pointer_reduce_never_underflows() {
        let dt = Datatype::pointer_to(PrimitiveKind::Int, 1);
        let reduced = dt.pointer_reduce(5);
        assert_eq!(reduced.pointer_depth, 0);
    }

    #[test]
    fn pointer_operand_prefers_first() {
        let ptr = Datatype::pointer_to(PrimitiveKind::Int, 1);
        let val = Datatype::new(PrimitiveKind::Int);
        assert!(pointer_operand(&ptr, &val).unwrap().is_pointer);
        assert!(pointer_operand(&val, &ptr).unwrap().is_pointer);
        assert!(pointer_operand(&val, &val).is_none());
    }

    #[test]
    fn invariant_pointer_depth_zero_iff_not_pointer() {
        let dt = Datatype::new(PrimitiveKind::Int);
        assert_eq!(dt.pointer_depth, 0);
        assert!(!dt.is_pointer);
    }
}
