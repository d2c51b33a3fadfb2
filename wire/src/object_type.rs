//! Registry of stream object type codes.
//!
//! Every type code used on the wire and whether objects of that type are
//! compound (carry framed children and an End header) is declared once here.

use std::fmt;

macro_rules! stream_object_types {
    ($($(#[$meta:meta])* $name:ident = $code:literal, $compound:literal;)+) => {
        /// A stream object type code.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize))]
        #[non_exhaustive]
        pub enum StreamObjectType {
            $($(#[$meta])* $name,)+
        }

        impl StreamObjectType {
            /// Every registered type, in code order.
            pub const ALL: &'static [Self] = &[$(Self::$name,)+];

            /// Returns the numeric type code.
            #[must_use]
            pub const fn code(self) -> u16 {
                match self {
                    $(Self::$name => $code,)+
                }
            }

            /// Looks up a type by its numeric code.
            #[must_use]
            pub const fn from_code(code: u16) -> Option<Self> {
                match code {
                    $($code => Some(Self::$name),)+
                    _ => None,
                }
            }

            /// Returns `true` if objects of this type are compound.
            #[must_use]
            pub const fn is_compound(self) -> bool {
                match self {
                    $(Self::$name => $compound,)+
                }
            }

            /// Returns the type name.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$name => stringify!($name),)+
                }
            }
        }
    };
}

stream_object_types! {
    DataElement = 0x01, true;
    ObjectDataBlob = 0x02, false;
    WaterlineKnowledgeEntry = 0x04, false;
    ObjectGroupObjectBlobDataDeclaration = 0x05, false;
    StorageManifestRootDeclare = 0x07, false;
    RevisionManifestRootDeclare = 0x0A, false;
    CellManifestCurrentRevision = 0x0B, false;
    StorageManifestSchemaGuid = 0x0C, false;
    StorageIndexRevisionMapping = 0x0D, false;
    StorageIndexCellMapping = 0x0E, false;
    CellKnowledgeRange = 0x0F, false;
    Knowledge = 0x10, true;
    StorageIndexManifestMapping = 0x11, false;
    CellKnowledge = 0x14, true;
    DataElementPackage = 0x15, true;
    ObjectGroupObjectData = 0x16, false;
    CellKnowledgeEntry = 0x17, false;
    ObjectGroupObjectDeclare = 0x18, false;
    RevisionManifestObjectGroupReferences = 0x19, false;
    RevisionManifest = 0x1A, false;
    ObjectGroupObjectDataBlobReference = 0x1C, false;
    ObjectGroupDeclarations = 0x1D, true;
    ObjectGroupData = 0x1E, true;
    LeafNodeObject = 0x1F, true;
    IntermediateNodeObject = 0x20, true;
    SignatureObject = 0x21, false;
    DataSizeObject = 0x22, false;
    WaterlineKnowledge = 0x29, true;
    ContentTagKnowledge = 0x2D, true;
    ContentTagKnowledgeEntry = 0x2E, false;
    Request = 0x40, true;
    SubResponse = 0x41, true;
    SubRequest = 0x42, true;
    ReadAccessResponse = 0x43, true;
    SpecializedKnowledge = 0x44, true;
    PutChangesResponseSerialNumberReassignAll = 0x45, false;
    WriteAccessResponse = 0x46, true;
    QueryChangesFilter = 0x47, true;
    Win32Error = 0x49, false;
    ProtocolError = 0x4B, false;
    ResponseError = 0x4D, true;
    ErrorStringSupplementalInfo = 0x4E, false;
    UserAgentVersion = 0x4F, false;
    QueryChangesFilterSchemaSpecific = 0x50, false;
    QueryChangesRequest = 0x51, false;
    HresultError = 0x52, false;
    PutChangesResponseSerialNumberReassign = 0x53, false;
    QueryChangesFilterDataElementIds = 0x54, false;
    UserAgentGuid = 0x55, false;
    QueryChangesFilterDataElementType = 0x57, false;
    QueryChangesDataConstraint = 0x59, false;
    PutChangesRequest = 0x5A, false;
    QueryChangesRequestArguments = 0x5B, false;
    QueryChangesFilterCellId = 0x5C, false;
    UserAgent = 0x5D, true;
    QueryChangesResponse = 0x5F, false;
    QueryChangesFilterHierarchy = 0x60, false;
    Response = 0x62, true;
    QueryDataElementRequest = 0x65, false;
    CellError = 0x66, false;
    QueryChangesFilterFlags = 0x68, false;
    DataElementFragment = 0x6A, false;
    FragmentKnowledge = 0x6B, true;
    FragmentKnowledgeEntry = 0x6C, false;
    ObjectGroupMetadata = 0x78, false;
    ObjectGroupMetadataDeclarations = 0x79, true;
    AllocateExtendedGuidRangeRequest = 0x80, false;
    AllocateExtendedGuidRangeResponse = 0x81, false;
    TargetPartitionId = 0x83, false;
    PutChangesLockId = 0x85, false;
    AdditionalFlags = 0x86, false;
    PutChangesResponse = 0x87, false;
    RequestHashOptions = 0x88, false;
    DiagnosticRequestOptionOutput = 0x89, false;
    DiagnosticRequestOptionInput = 0x8A, false;
    DataElementHash = 0x100, false;
}

impl fmt::Display for StreamObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_roundtrip() {
        for &ty in StreamObjectType::ALL {
            assert_eq!(StreamObjectType::from_code(ty.code()), Some(ty));
        }
    }

    #[test]
    fn codes_are_unique_and_ordered() {
        let codes: Vec<u16> = StreamObjectType::ALL.iter().map(|ty| ty.code()).collect();
        assert!(codes.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn undefined_codes() {
        assert_eq!(StreamObjectType::from_code(0x00), None);
        assert_eq!(StreamObjectType::from_code(0x3F), None);
        assert_eq!(StreamObjectType::from_code(0x3FFF), None);
    }

    #[test]
    fn compound_classification() {
        assert!(StreamObjectType::Request.is_compound());
        assert!(StreamObjectType::SubRequest.is_compound());
        assert!(StreamObjectType::DataElementPackage.is_compound());
        assert!(StreamObjectType::QueryChangesFilter.is_compound());
        assert!(!StreamObjectType::QueryChangesRequest.is_compound());
        assert!(!StreamObjectType::UserAgentGuid.is_compound());
        assert!(!StreamObjectType::ObjectDataBlob.is_compound());
    }

    #[test]
    fn display_names_type() {
        assert_eq!(StreamObjectType::SubRequest.to_string(), "SubRequest(0x42)");
        assert_eq!(StreamObjectType::DataElementHash.to_string(), "DataElementHash(0x100)");
    }
}
