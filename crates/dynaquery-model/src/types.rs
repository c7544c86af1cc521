//! Shared DynamoDB enums used by request payloads.

/// Determines what values are returned by write operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReturnValue {
    /// Nothing is returned.
    #[default]
    None,
    /// Returns all attributes of the item as they appeared before the operation.
    AllOld,
    /// Returns only the updated attributes as they appeared before the operation.
    UpdatedOld,
    /// Returns all attributes of the item as they appear after the operation.
    AllNew,
    /// Returns only the updated attributes as they appear after the operation.
    UpdatedNew,
}

impl ReturnValue {
    /// Returns the DynamoDB wire-format string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::AllOld => "ALL_OLD",
            Self::UpdatedOld => "UPDATED_OLD",
            Self::AllNew => "ALL_NEW",
            Self::UpdatedNew => "UPDATED_NEW",
        }
    }
}

impl std::fmt::Display for ReturnValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar types allowed for key attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarAttributeType {
    /// String.
    S,
    /// Number.
    N,
    /// Binary.
    B,
}

impl ScalarAttributeType {
    /// Returns the DynamoDB type descriptor.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S => "S",
            Self::N => "N",
            Self::B => "B",
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_display_return_value_as_request_token() {
        assert_eq!(ReturnValue::UpdatedNew.to_string(), "UPDATED_NEW");
        assert_eq!(ReturnValue::default().as_str(), "NONE");
        assert_eq!(ScalarAttributeType::N.as_str(), "N");
    }
}
