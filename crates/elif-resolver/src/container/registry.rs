use std::borrow::Cow;
use std::collections::HashMap;

use crate::container::descriptor::{GenericShape, ServiceDescriptor, ServiceId};

/// Read-only index from contract to its registrations, in registration order.
///
/// Built by [`ServiceRegistryBuilder`](crate::container::builder::ServiceRegistryBuilder)
/// and never mutated afterwards, so it can be shared across threads.
#[derive(Debug, Default)]
pub struct ServiceRegistry {
    services: HashMap<ServiceId, Vec<ServiceDescriptor>>,
    open_generics: HashMap<GenericShape, Vec<ServiceDescriptor>>,
    next_order: usize,
}

impl ServiceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, mut descriptor: ServiceDescriptor) {
        descriptor.order = self.next_order;
        self.next_order += 1;

        if descriptor.is_open_generic() {
            tracing::trace!("Registering open generic '{}'", descriptor.service_id);
            self.open_generics
                .entry(descriptor.service_id.shape())
                .or_default()
                .push(descriptor);
        } else {
            tracing::trace!("Registering service '{}'", descriptor.service_id);
            self.services
                .entry(descriptor.service_id.clone())
                .or_default()
                .push(descriptor);
        }
    }

    /// All registrations for a contract, in registration order.
    ///
    /// Closed generic contracts also collect matching open registrations.
    pub fn lookup_all(&self, service_id: &ServiceId) -> Vec<Cow<'_, ServiceDescriptor>> {
        let mut entries: Vec<Cow<'_, ServiceDescriptor>> = self
            .services
            .get(service_id)
            .into_iter()
            .flatten()
            .map(Cow::Borrowed)
            .collect();

        if service_id.is_generic() {
            if let Some(open) = self.open_generics.get(&service_id.shape()) {
                entries.extend(
                    open.iter()
                        .filter_map(|d| d.close(&service_id.type_args))
                        .map(Cow::Owned),
                );
                entries.sort_by_key(|d| d.order);
            }
        }

        entries
    }

    /// The most recent registration for a contract.
    ///
    /// Exact registrations win; otherwise the last open generic registration
    /// whose contract pattern fits the type arguments is closed over them.
    pub fn lookup_last(&self, service_id: &ServiceId) -> Option<Cow<'_, ServiceDescriptor>> {
        if let Some(descriptor) = self.services.get(service_id).and_then(|d| d.last()) {
            return Some(Cow::Borrowed(descriptor));
        }

        if !service_id.is_generic() {
            return None;
        }

        self.open_generics
            .get(&service_id.shape())
            .and_then(|open| open.iter().rev().find_map(|d| d.close(&service_id.type_args)))
            .map(Cow::Owned)
    }

    /// Check whether a single-implementation lookup would succeed
    pub fn contains(&self, service_id: &ServiceId) -> bool {
        self.services.contains_key(service_id)
            || (service_id.is_generic()
                && self
                    .open_generics
                    .get(&service_id.shape())
                    .is_some_and(|open| open.iter().any(|d| d.accepts(&service_id.type_args))))
    }

    /// Closed contracts with at least one registration, in first-registration order
    pub fn service_ids(&self) -> Vec<ServiceId> {
        let mut ids: Vec<(usize, &ServiceId)> = self
            .services
            .iter()
            .filter_map(|(id, entries)| entries.first().map(|d| (d.order, id)))
            .collect();
        ids.sort_by_key(|(order, _)| *order);
        ids.into_iter().map(|(_, id)| id.clone()).collect()
    }

    /// Open generic shapes with at least one registration
    pub fn open_generic_shapes(&self) -> Vec<&GenericShape> {
        let mut shapes: Vec<&GenericShape> = self.open_generics.keys().collect();
        shapes.sort();
        shapes
    }

    /// Total number of registrations
    pub fn len(&self) -> usize {
        self.next_order
    }

    pub fn is_empty(&self) -> bool {
        self.next_order == 0
    }
}
