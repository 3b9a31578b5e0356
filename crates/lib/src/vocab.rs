//! Reserved vocabulary IRIs.
//!
//! Operations, metadata and tombstones are persisted as ordinary triples using
//! the `crdt:` vocabulary below. The type-index constants are the public
//! Solid/LDP terms so discovery documents interoperate with existing servers.

/// Base IRI of the operation-log vocabulary.
pub const CRDT: &str = "https://vocab.graft.dev/crdt#";

// crdt: classes
pub const CRDT_SET_PROPERTY_OPERATION: &str = "https://vocab.graft.dev/crdt#SetPropertyOperation";
pub const CRDT_UNSET_PROPERTY_OPERATION: &str =
    "https://vocab.graft.dev/crdt#UnsetPropertyOperation";
pub const CRDT_METADATA: &str = "https://vocab.graft.dev/crdt#Metadata";
pub const CRDT_TOMBSTONE: &str = "https://vocab.graft.dev/crdt#Tombstone";

// crdt: predicates
pub const CRDT_RESOURCE: &str = "https://vocab.graft.dev/crdt#resource";
pub const CRDT_PROPERTY: &str = "https://vocab.graft.dev/crdt#property";
pub const CRDT_DATE: &str = "https://vocab.graft.dev/crdt#date";
pub const CRDT_VALUE: &str = "https://vocab.graft.dev/crdt#value";
pub const CRDT_CREATED_AT: &str = "https://vocab.graft.dev/crdt#createdAt";
pub const CRDT_UPDATED_AT: &str = "https://vocab.graft.dev/crdt#updatedAt";
pub const CRDT_DELETED_AT: &str = "https://vocab.graft.dev/crdt#deletedAt";

// RDF / XSD
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
pub const XSD_DATETIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

// LDP container terms
pub const LDP_CONTAINS: &str = "http://www.w3.org/ns/ldp#contains";
pub const LDP_CONTAINER: &str = "http://www.w3.org/ns/ldp#Container";

// Solid type-index terms
pub const SOLID_TYPE_INDEX: &str = "http://www.w3.org/ns/solid/terms#TypeIndex";
pub const SOLID_UNLISTED_DOCUMENT: &str = "http://www.w3.org/ns/solid/terms#UnlistedDocument";
pub const SOLID_TYPE_REGISTRATION: &str = "http://www.w3.org/ns/solid/terms#TypeRegistration";
pub const SOLID_FOR_CLASS: &str = "http://www.w3.org/ns/solid/terms#forClass";
pub const SOLID_INSTANCE_CONTAINER: &str = "http://www.w3.org/ns/solid/terms#instanceContainer";

/// Check whether an IRI belongs to the reserved operation-log vocabulary.
pub fn is_crdt_term(iri: &str) -> bool {
    iri.starts_with(CRDT)
}
