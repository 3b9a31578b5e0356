//! Type-index discovery.
//!
//! A type index maps RDF classes to the containers their instances live in,
//! using the public Solid vocabulary. The sync engine consults it only to
//! discover which containers to scan; it plays no part in conflict
//! resolution.

use crate::graph::{Graph, Term, Triple};
use crate::op::Operation;
use crate::store::Document;
use crate::vocab;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A consumed application-model descriptor.
///
/// Models scope the merge: only resources whose type matches one of a model's
/// classes are reconciled. `requires_registration` marks models that must be
/// discoverable through a type registration once instances exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub name: String,
    pub rdf_classes: Vec<String>,
    pub requires_registration: bool,
}

impl ModelDescriptor {
    pub fn new(name: impl Into<String>, rdf_classes: Vec<String>) -> Self {
        Self {
            name: name.into(),
            rdf_classes,
            requires_registration: true,
        }
    }

    /// Whether any of this model's classes appears among `types`.
    pub fn matches_types(&self, types: &[&str]) -> bool {
        self.rdf_classes.iter().any(|c| types.contains(&c.as_str()))
    }
}

/// One `solid:TypeRegistration`: a set of classes and the container holding
/// their instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRegistration {
    pub url: String,
    pub for_class: Vec<String>,
    pub instance_container: String,
}

/// An ordered collection of type registrations read from one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeIndex {
    pub url: String,
    pub registrations: Vec<TypeRegistration>,
}

impl TypeIndex {
    /// An empty index at a URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            registrations: Vec::new(),
        }
    }

    /// Decode an index from its stored document.
    ///
    /// Subjects typed `solid:TypeRegistration` become registrations, in the
    /// document's deterministic subject order. Registrations missing either
    /// field are skipped; a partially written index should narrow discovery,
    /// not abort it.
    pub fn from_document(document: &Document) -> Self {
        let graph = &document.graph;
        let mut registrations = Vec::new();
        for subject in graph.subjects_with_type(vocab::SOLID_TYPE_REGISTRATION) {
            let for_class: Vec<String> = graph
                .objects(subject, vocab::SOLID_FOR_CLASS)
                .into_iter()
                .filter_map(Term::as_named)
                .map(str::to_string)
                .collect();
            let instance_container = graph
                .first_object(subject, vocab::SOLID_INSTANCE_CONTAINER)
                .and_then(Term::as_named)
                .map(str::to_string);
            match instance_container {
                Some(instance_container) if !for_class.is_empty() => {
                    registrations.push(TypeRegistration {
                        url: subject.to_string(),
                        for_class,
                        instance_container,
                    });
                }
                _ => {}
            }
        }
        Self {
            url: document.url.clone(),
            registrations,
        }
    }

    /// The graph of a brand-new, empty index document.
    pub fn initial_graph(url: &str) -> Graph {
        let mut graph = Graph::new();
        graph.insert(Triple::new(
            url,
            vocab::RDF_TYPE,
            Term::named(vocab::SOLID_TYPE_INDEX),
        ));
        graph.insert(Triple::new(
            url,
            vocab::RDF_TYPE,
            Term::named(vocab::SOLID_UNLISTED_DOCUMENT),
        ));
        graph
    }

    /// For each registered container matching one of `models`, the subset of
    /// models that apply to it. Registration order is preserved; a container
    /// registered several times is reported once with the union of its models.
    pub fn matching_containers<'m>(
        &self,
        models: &'m [ModelDescriptor],
    ) -> Vec<(String, Vec<&'m ModelDescriptor>)> {
        let mut containers: Vec<(String, Vec<&'m ModelDescriptor>)> = Vec::new();
        for registration in &self.registrations {
            let classes: Vec<&str> = registration.for_class.iter().map(String::as_str).collect();
            let matched: Vec<&'m ModelDescriptor> = models
                .iter()
                .filter(|model| model.matches_types(&classes))
                .collect();
            if matched.is_empty() {
                continue;
            }
            match containers
                .iter_mut()
                .find(|(url, _)| *url == registration.instance_container)
            {
                Some((_, existing)) => {
                    for model in matched {
                        if !existing.iter().any(|m| m.name == model.name) {
                            existing.push(model);
                        }
                    }
                }
                None => containers.push((registration.instance_container.clone(), matched)),
            }
        }
        containers
    }

    /// Whether some registration already maps `class` to `container`.
    pub fn covers(&self, container: &str, class: &str) -> bool {
        self.registrations.iter().any(|r| {
            r.instance_container == container && r.for_class.iter().any(|c| c == class)
        })
    }

    /// The operations that add a registration for `classes` at `container`.
    ///
    /// The registration URL is minted from the index URL, the container and
    /// the class list, so regenerating the same registration on two replicas
    /// converges on one resource.
    pub fn registration_operations(
        &self,
        container: &str,
        classes: &[String],
        date: DateTime<Utc>,
    ) -> (TypeRegistration, Vec<Operation>) {
        let class_terms: Vec<Term> = classes.iter().map(|c| Term::named(c.as_str())).collect();
        let mut hasher = Sha256::new();
        hasher.update(container.as_bytes());
        for class in classes {
            hasher.update([0]);
            hasher.update(class.as_bytes());
        }
        let digest = hex::encode(&hasher.finalize()[..8]);
        let url = format!("{}#registration-{digest}", self.url);

        let operations = vec![
            Operation::set(
                &url,
                vocab::RDF_TYPE,
                vec![Term::named(vocab::SOLID_TYPE_REGISTRATION)],
                date,
            ),
            Operation::set(&url, vocab::SOLID_FOR_CLASS, class_terms, date),
            Operation::set(
                &url,
                vocab::SOLID_INSTANCE_CONTAINER,
                vec![Term::named(container)],
                date,
            ),
        ];
        let registration = TypeRegistration {
            url,
            for_class: classes.to_vec(),
            instance_container: container.to_string(),
        };
        (registration, operations)
    }
}
