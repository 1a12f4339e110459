//! Macros to reduce boilerplate in the codebase

/// Macro to generate Display and FromStr implementations for enums
///
/// Parsing is case-insensitive. Extra aliases may follow the canonical
/// spelling and are accepted by `FromStr` but never produced by `Display`.
///
/// # Usage
///
/// ```rust,ignore
/// use crate::error::DeskError;
///
/// enum_display_fromstr!(
///     MyEnum,
///     DeskError::InvalidStatus,
///     {
///         Variant1 => "variant1",
///         Variant2 => "variant-2" | "variant_2",
///     }
/// );
/// ```
#[macro_export]
macro_rules! enum_display_fromstr {
    (
        $enum_name:ident,
        $error_variant:path,
        { $($variant:ident => $str:literal $(| $alias:literal)*),+ $(,)? }
    ) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $($enum_name::$variant => write!(f, $str),)+
                }
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = $crate::error::DeskError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str $(| $alias)* => Ok($enum_name::$variant),)+
                    _ => Err($error_variant(s.to_string())),
                }
            }
        }
    };
}

#[cfg(test)]
mod test {
    use crate::error::DeskError;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum TestEnum {
        A,
        B,
    }

    enum_display_fromstr!(TestEnum, DeskError::InvalidStatus, { A => "a", B => "b-b" | "b_b" });

    #[test]
    fn test_display() {
        assert_eq!(TestEnum::A.to_string(), "a");
        assert_eq!(TestEnum::B.to_string(), "b-b");
    }

    #[test]
    fn test_fromstr_aliases() {
        assert_eq!("A".parse::<TestEnum>().unwrap(), TestEnum::A);
        assert_eq!("b_b".parse::<TestEnum>().unwrap(), TestEnum::B);
        assert!(matches!(
            "c".parse::<TestEnum>(),
            Err(DeskError::InvalidStatus(s)) if s == "c"
        ));
    }
}
