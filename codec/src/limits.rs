//! Limits for request decoding.

/// Limits enforced while decoding requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecLimits {
    /// Maximum size of an encoded request in bytes.
    pub max_request_bytes: usize,
    /// Maximum number of sub-requests in one request.
    pub max_sub_requests: usize,
    /// Maximum number of filters in one query changes sub-request.
    pub max_filters_per_sub_request: usize,
    /// Maximum number of data elements in a data element package.
    pub max_data_elements: usize,
    /// Maximum number of mappings, declarations or objects inside one data element.
    pub max_objects_per_data_element: usize,
    /// Maximum number of ranges and entries in one knowledge object.
    pub max_knowledge_entries: usize,
    /// Maximum stream object nesting depth.
    pub max_nesting_depth: usize,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_request_bytes: 16 * 1024 * 1024,
            max_sub_requests: 256,
            max_filters_per_sub_request: 64,
            max_data_elements: 65_536,
            max_objects_per_data_element: 65_536,
            max_knowledge_entries: 4096,
            max_nesting_depth: 32,
        }
    }
}

impl CodecLimits {
    /// Creates limits suitable for testing with smaller values.
    #[must_use]
    pub const fn for_testing() -> Self {
        Self {
            max_request_bytes: 64 * 1024,
            max_sub_requests: 8,
            max_filters_per_sub_request: 4,
            max_data_elements: 32,
            max_objects_per_data_element: 64,
            max_knowledge_entries: 16,
            max_nesting_depth: 8,
        }
    }

    /// Creates limits with no restrictions (use with caution).
    #[must_use]
    pub const fn unlimited() -> Self {
        Self {
            max_request_bytes: usize::MAX,
            max_sub_requests: usize::MAX,
            max_filters_per_sub_request: usize::MAX,
            max_data_elements: usize::MAX,
            max_objects_per_data_element: usize::MAX,
            max_knowledge_entries: usize::MAX,
            max_nesting_depth: usize::MAX,
        }
    }
}
