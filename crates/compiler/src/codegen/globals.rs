//! Global variable and struct-layout bookkeeping the code generator
//! consults while emitting function bodies.
//!
//! Grounded on `codegen.c`'s `.data` emission for top-level
//! declarations and `symresolver.c`'s struct/union field-offset table.

use crate::ast::{Ast, NodeKind};
use rcc_core::Datatype;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct StructLayout {
    /// field name -> (byte offset, datatype), in declaration order.
    pub fields: Vec<(String, isize, Datatype)>,
    pub size: usize,
}

impl StructLayout {
    pub fn offset_of(&self, field: &str) -> Option<(isize, Datatype)> {
        self.fields
            .iter()
            .find(|(name, _, _)| name == field)
            .map(|(_, off, dt)| (*off, dt.clone()))
    }
}

/// Struct/union layouts and global variable offsets, built once from
/// the top-level AST before any function body is generated, since a
/// function may reference a struct or global declared later in the
/// file (C allows forward use after a prototype/forward declaration).
#[derive(Debug, Default)]
pub struct GlobalTable {
    pub structs: HashMap<String, StructLayout>,
    pub globals: HashMap<String, Datatype>,
}

impl GlobalTable {
    pub fn build(ast: &Ast) -> Self {
        let mut table = GlobalTable::default();
        for &node_id in &ast.top_level {
            match &ast.get(node_id).kind {
                NodeKind::StructDef {
                    name: Some(name),
                    is_union,
                    fields,
                    is_forward_declaration: false,
                } => {
                    let mut layout = StructLayout::default();
                    if *is_union {
                        // Spec §4.5: every union field starts at offset 0;
                        // the union's size is its largest member, not a sum.
                        for field in fields {
                            let mut dt = field.datatype.clone();
                            table.patch_struct_size(&mut dt);
                            layout.fields.push((field.name.clone(), 0, dt));
                        }
                        layout.size = layout.fields.iter().map(|(_, _, dt)| dt.size()).max().unwrap_or(0);
                    } else {
                        let mut offset = 0isize;
                        for field in fields {
                            let mut dt = field.datatype.clone();
                            table.patch_struct_size(&mut dt);
                            offset += dt.size() as isize;
                            layout.fields.push((field.name.clone(), offset - dt.size() as isize, dt));
                        }
                        layout.size = offset as usize;
                    }
                    table.structs.insert(name.clone(), layout);
                }
                NodeKind::VarDecl { name, datatype, .. } => {
                    let mut dt = datatype.clone();
                    table.patch_struct_size(&mut dt);
                    table.globals.insert(name.clone(), dt);
                }
                _ => {}
            }
        }
        table
    }

    /// The named struct/union's size, once its `StructDef` has been
    /// processed by `build`.
    pub fn struct_size_of(&self, name: &str) -> Option<usize> {
        self.structs.get(name).map(|layout| layout.size)
    }

    /// Patches `dt.struct_size` from this table when `dt` references a
    /// struct/union by name, so `dt.size()` (and `size_for_array_access`)
    /// report the real aggregate size instead of `0`. A no-op for
    /// non-struct datatypes, and for a struct name this table hasn't
    /// seen yet (an as-yet-undefined forward reference).
    pub fn patch_struct_size(&self, dt: &mut Datatype) {
        if let Some(name) = dt.struct_name.clone() {
            if let Some(size) = self.struct_size_of(&name) {
                dt.set_struct_size(size);
            }
        }
    }
}
