//! The fixup system (spec §4.8 / C8).
//!
//! Grounded on `fixup.c`: callers register a `(fix, end)` callback pair
//! for a forward reference (a `goto` target not yet emitted, or a
//! label whose final address isn't known until later codegen).
//! `resolve_all` retries every unresolved fixup and returns whether
//! every one of them eventually resolved.

pub type FixFn<Ctx> = Box<dyn FnMut(&mut Ctx) -> bool>;
pub type EndFn<Ctx> = Box<dyn FnMut(&mut Ctx)>;

struct Fixup<Ctx> {
    label: String,
    fix: FixFn<Ctx>,
    end: EndFn<Ctx>,
    resolved: bool,
}

/// A pending forward reference registry, generic over whatever
/// codegen context (`Ctx`) the callbacks need to mutate — the label
/// table, the assembly output buffer, etc.
pub struct FixupSystem<Ctx> {
    fixups: Vec<Fixup<Ctx>>,
}

impl<Ctx> Default for FixupSystem<Ctx> {
    fn default() -> Self {
        FixupSystem { fixups: Vec::new() }
    }
}

impl<Ctx> FixupSystem<Ctx> {
    pub fn new() -> Self {
        FixupSystem::default()
    }

    /// `fixup_register`: `fix` attempts the patch and returns whether
    /// it succeeded (e.g. the label is now known); `end` runs once,
    /// after it does, to do any cleanup (emit the final jump target).
    pub fn register(
        &mut self,
        label: impl Into<String>,
        fix: FixFn<Ctx>,
        end: EndFn<Ctx>,
    ) {
        self.fixups.push(Fixup {
            label: label.into(),
            fix,
            end,
            resolved: false,
        });
    }

    pub fn unresolved_count(&self) -> usize {
        self.fixups.iter().filter(|f| !f.resolved).count()
    }

    /// `fixup_resolve`: attempts every unresolved fixup once in
    /// registration order, marking any that now succeed.
    fn resolve_pass(&mut self, ctx: &mut Ctx) {
        for fixup in self.fixups.iter_mut().filter(|f| !f.resolved) {
            if (fixup.fix)(ctx) {
                fixup.resolved = true;
                (fixup.end)(ctx);
            }
        }
    }

    /// `fixups_resolve`: retries resolution passes until a pass makes
    /// no further progress, then reports whether everything resolved.
    pub fn resolve_all(&mut self, ctx: &mut Ctx) -> bool {
        loop {
            let before = self.unresolved_count();
            if before == 0 {
                return true;
            }
            self.resolve_pass(ctx);
            if self.unresolved_count() == before {
                return false;
            }
        }
    }

    pub fn unresolved_labels(&self) -> Vec<&str> {
        self.fixups
            .iter()
            .filter(|f| !f.resolved)
            .map(|f| f.label.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Ctx {
        known_labels: Vec<String>,
        emitted: Vec<String>,
    }

    #[test]
    fn fixup_resolves_once_label_becomes_known() {
        let mut sys = FixupSystem::new();
        sys.register(
            "loop_end",
            Box::new(|ctx: &mut Ctx| ctx.known_labels.contains(&"loop_end".to_string())),
            Box::new(|ctx: &mut Ctx| ctx.emitted.push("jmp loop_end".to_string())),
        );
        let mut ctx = Ctx::default();
        assert!(!sys.resolve_all(&mut ctx));
        ctx.known_labels.push("loop_end".to_string());
        assert!(sys.resolve_all(&mut ctx));
        assert_eq!(ctx.emitted, vec!["jmp loop_end"]);
    }

    #[test]
    fn permanently_unresolved_fixup_reports_false() {
        let mut sys: FixupSystem<Ctx> = FixupSystem::new();
        sys.register("nowhere", Box::new(|_| false), Box::new(|_| {}));
        let mut ctx = Ctx::default();
        assert!(!sys.resolve_all(&mut ctx));
        assert_eq!(sys.unresolved_labels(), vec!["nowhere"]);
    }

    #[test]
    fn multiple_fixups_resolve_independently() {
        let mut sys = FixupSystem::new();
        sys.register(
            "a",
            Box::new(|ctx: &mut Ctx| ctx.known_labels.contains(&"a".to_string())),
            Box::new(|ctx: &mut Ctx| ctx.emitted.push("a".to_string())),
        );
        sys.register(
            "b",
            Box::new(|ctx: &mut Ctx| ctx.known_labels.contains(&"b".to_string())),
            Box::new(|ctx: &mut Ctx| ctx.emitted.push("b".to_string())),
        );
        let mut ctx = Ctx::default();
        ctx.known_labels.push("a".to_string());
        ctx.known_labels.push("b".to_string());
        assert!(sys.resolve_all(&mut ctx));
        assert_eq!(ctx.emitted.len(), 2);
    }
}
