//! Structural-validity gate for backend output

/// Marker of a test declaration
pub const TEST_MARKER: &str = "test(";
/// Marker of the test framework import
pub const FRAMEWORK_MARKER: &str = "@playwright/test";

/// Whether a body looks like a probe: it declares a test and imports the
/// framework. Nothing is executed or parsed here.
pub fn accepts(code: &str) -> bool {
    code.contains(TEST_MARKER) && code.contains(FRAMEWORK_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_needs_both_markers() {
        assert!(accepts("import { test } from '@playwright/test';\ntest('a', async () => {});"));
        assert!(!accepts("test('a', async () => {});"));
        assert!(!accepts("import { test } from '@playwright/test';"));
        assert!(!accepts("Sorry, I cannot help with that."));
    }

    #[test]
    fn test_gate_is_structural_only() {
        // Not valid probe grammar, still accepted
        assert!(accepts("@playwright/test test( this is nonsense"));
    }
}
