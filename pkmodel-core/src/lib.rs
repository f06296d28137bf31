//! PKMODEL Core - Model Descriptor Types
//!
//! Pure data structures with no parsing behavior. The DSL crate produces these,
//! the CLI serializes them, and an external simulation engine consumes them.

mod descriptor;
mod error;

pub use descriptor::*;
pub use error::*;

/// Event and time quantities the simulation engine always provides.
///
/// Compartment names are state quantities as well; they are resolved from the
/// descriptor itself rather than listed here.
pub const BUILTIN_QUANTITIES: &[&str] = &[
    "TIME",
    "SOLVERTIME",
    "EVID",
    "CMT",
    "AMT",
    "ID",
    "SS",
    "II",
    "ADDL",
    "RATE",
    "NEWIND",
    "self",
    "M_PI",
    "M_E",
];

/// Returns true for `THETA<n>` fixed-effect references (`THETA1`, `THETA12`).
pub fn is_theta_reference(name: &str) -> bool {
    name.strip_prefix("THETA")
        .map(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

/// Returns true when `name` is a built-in quantity of the engine.
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_QUANTITIES.contains(&name) || is_theta_reference(name)
}

/// Returns true for a C-style identifier: `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theta_reference() {
        assert!(is_theta_reference("THETA1"));
        assert!(is_theta_reference("THETA12"));
        assert!(!is_theta_reference("THETA"));
        assert!(!is_theta_reference("THETAX"));
        assert!(!is_theta_reference("theta1"));
    }

    #[test]
    fn test_builtins() {
        assert!(is_builtin("TIME"));
        assert!(is_builtin("THETA3"));
        assert!(!is_builtin("CL"));
    }

    #[test]
    fn test_identifier() {
        assert!(is_identifier("CENT"));
        assert!(is_identifier("_tmp1"));
        assert!(!is_identifier("1CENT"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("CL-2"));
    }
}
