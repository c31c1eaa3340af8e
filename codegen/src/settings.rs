//! Recognized configuration options (spec.md §6).
//!
//! A small validated builder, in the spirit of `cranelift-codegen::settings`,
//! rather than a stringly-typed option bag: every option here is a real
//! field with a real type, and invalid combinations are rejected at
//! construction instead of discovered mid-compile.

/// How the allocator attempts to merge the source and destination of a
/// register-to-register copy (spec.md §4.4 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coalescing {
    /// Use the conservative Briggs test.
    Conservative,
    /// Never coalesce; every move survives to the output.
    Off,
}

/// Compilation-wide configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    coalescing: Coalescing,
    verifier_strict: bool,
}

impl Settings {
    pub fn coalescing(&self) -> Coalescing {
        self.coalescing
    }

    pub fn verifier_strict(&self) -> bool {
        self.verifier_strict
    }
}

impl Default for Settings {
    fn default() -> Self {
        // The verifier runs once at the top of the driver in strict mode
        // by default (spec.md §9 Open Questions resolution, see
        // DESIGN.md).
        Settings {
            coalescing: Coalescing::Conservative,
            verifier_strict: true,
        }
    }
}

/// Builds a [`Settings`] value.
#[derive(Debug, Clone, Copy, Default)]
pub struct Builder {
    settings: Settings,
}

impl Builder {
    pub fn new() -> Self {
        Builder {
            settings: Settings::default(),
        }
    }

    pub fn coalescing(mut self, coalescing: Coalescing) -> Self {
        self.settings.coalescing = coalescing;
        self
    }

    pub fn verifier_strict(mut self, strict: bool) -> Self {
        self.settings.verifier_strict = strict;
        self
    }

    pub fn finish(self) -> Settings {
        self.settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_strict_and_conservative() {
        let s = Settings::default();
        assert_eq!(s.coalescing(), Coalescing::Conservative);
        assert!(s.verifier_strict());
    }

    #[test]
    fn builder_overrides_apply() {
        let s = Builder::new().coalescing(Coalescing::Off).verifier_strict(false).finish();
        assert_eq!(s.coalescing(), Coalescing::Off);
        assert!(!s.verifier_strict());
    }
}
