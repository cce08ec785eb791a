use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::watch;

use super::model::{Contact, ContactId, Relationship};
use super::validation::{validate_contact, ValidationError};
use crate::runtime::{RakshaRuntime, RuntimeEvent};

/// Directory change notifications.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContactEvent {
    Added { contact: Contact },
    Removed { id: ContactId, name: String },
    EmergencyToggled { id: ContactId, is_emergency: bool },
}

/// In-memory, insertion-ordered list of trusted contacts.
///
/// Mutations are serialized through one write lock; change notifications are
/// published while that lock is held, so subscribers see them in mutation order.
pub struct ContactDirectory {
    contacts: RwLock<Vec<Contact>>,
    snapshot_tx: watch::Sender<Vec<Contact>>,
    runtime: Option<Arc<dyn RakshaRuntime>>,
}

impl ContactDirectory {
    pub fn new() -> Self {
        let (snapshot_tx, _) = watch::channel(Vec::new());
        Self {
            contacts: RwLock::new(Vec::new()),
            snapshot_tx,
            runtime: None,
        }
    }

    /// Directory that also forwards every change to the presentation runtime.
    pub fn with_runtime(runtime: Arc<dyn RakshaRuntime>) -> Self {
        Self {
            runtime: Some(runtime),
            ..Self::new()
        }
    }

    /// Validate and append a new contact. New contacts are never emergency contacts.
    pub fn add_contact(
        &self,
        name: &str,
        phone: &str,
        relationship: impl Into<Relationship>,
    ) -> Result<Contact, ValidationError> {
        let name = name.trim();
        let phone = phone.trim();
        validate_contact(name, phone)?;

        let contact = Contact::new(name.to_string(), phone.to_string(), relationship.into());

        let mut contacts = self.contacts.write();
        contacts.push(contact.clone());
        tracing::info!("[contacts] Added {} ({})", contact.name, contact.id());
        self.publish(
            &contacts,
            ContactEvent::Added {
                contact: contact.clone(),
            },
        );
        Ok(contact)
    }

    /// Remove a contact. Returns the removed contact, or `None` if the id is unknown.
    pub fn remove_contact(&self, id: ContactId) -> Option<Contact> {
        let mut contacts = self.contacts.write();
        let Some(index) = contacts.iter().position(|c| c.id() == id) else {
            tracing::debug!("[contacts] remove: no contact {}", id);
            return None;
        };

        let removed = contacts.remove(index);
        tracing::info!("[contacts] Removed {} ({})", removed.name, id);
        self.publish(
            &contacts,
            ContactEvent::Removed {
                id,
                name: removed.name.clone(),
            },
        );
        Some(removed)
    }

    /// Flip the emergency flag. Returns the new value, or `None` if the id is unknown.
    pub fn toggle_emergency(&self, id: ContactId) -> Option<bool> {
        let mut contacts = self.contacts.write();
        let Some(contact) = contacts.iter_mut().find(|c| c.id() == id) else {
            tracing::debug!("[contacts] toggle: no contact {}", id);
            return None;
        };

        contact.is_emergency = !contact.is_emergency;
        let is_emergency = contact.is_emergency;
        tracing::info!(
            "[contacts] {} emergency flag -> {}",
            contact.name,
            is_emergency
        );
        self.publish(&contacts, ContactEvent::EmergencyToggled { id, is_emergency });
        Some(is_emergency)
    }

    /// Contacts flagged as emergency contacts, in directory order.
    pub fn emergency_contacts(&self) -> Vec<Contact> {
        self.contacts
            .read()
            .iter()
            .filter(|c| c.is_emergency)
            .cloned()
            .collect()
    }

    pub fn non_emergency_contacts(&self) -> Vec<Contact> {
        self.contacts
            .read()
            .iter()
            .filter(|c| !c.is_emergency)
            .cloned()
            .collect()
    }

    pub fn emergency_count(&self) -> usize {
        self.contacts.read().iter().filter(|c| c.is_emergency).count()
    }

    pub fn contacts(&self) -> Vec<Contact> {
        self.contacts.read().clone()
    }

    pub fn get(&self, id: ContactId) -> Option<Contact> {
        self.contacts.read().iter().find(|c| c.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.contacts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.read().is_empty()
    }

    /// Subscribe to the full contact list; the receiver always holds the latest list.
    pub fn subscribe(&self) -> watch::Receiver<Vec<Contact>> {
        self.snapshot_tx.subscribe()
    }

    fn publish(&self, contacts: &[Contact], event: ContactEvent) {
        self.snapshot_tx.send_replace(contacts.to_vec());
        if let Some(runtime) = &self.runtime {
            if let Err(e) = runtime.emit(RuntimeEvent::Contacts(event)) {
                tracing::debug!("[contacts] event not delivered: {}", e);
            }
        }
    }
}

impl Default for ContactDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory_with(names: &[&str]) -> (ContactDirectory, Vec<ContactId>) {
        let directory = ContactDirectory::new();
        let ids = names
            .iter()
            .map(|name| {
                directory
                    .add_contact(name, "9876543210", "Friend")
                    .unwrap()
                    .id()
            })
            .collect();
        (directory, ids)
    }

    #[test]
    fn test_add_contact_validation() {
        let directory = ContactDirectory::new();
        assert!(directory.add_contact("", "1234567890", "Friend").is_err());
        assert!(directory.add_contact("A", "123", "Friend").is_err());

        let contact = directory.add_contact("A", "9876543210", "Friend").unwrap();
        assert!(!contact.is_emergency);
        assert_eq!(contact.relationship, Relationship::Friend);
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_failed_add_leaves_directory_unchanged() {
        let directory = ContactDirectory::new();
        let _ = directory.add_contact("", "", "Friend");
        assert!(directory.is_empty());
    }

    #[test]
    fn test_ids_unique_even_for_duplicate_entries() {
        let directory = ContactDirectory::new();
        let a = directory.add_contact("Same", "9876543210", "Friend").unwrap();
        let b = directory.add_contact("Same", "9876543210", "Friend").unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(directory.len(), 2);
    }

    #[test]
    fn test_toggle_twice_restores_flag() {
        let (directory, ids) = directory_with(&["A"]);
        assert_eq!(directory.toggle_emergency(ids[0]), Some(true));
        assert_eq!(directory.toggle_emergency(ids[0]), Some(false));
        assert!(!directory.get(ids[0]).unwrap().is_emergency);
    }

    #[test]
    fn test_missing_ids_are_noops() {
        let (directory, _) = directory_with(&["A"]);
        let unknown = uuid::Uuid::new_v4();
        assert_eq!(directory.remove_contact(unknown), None);
        assert_eq!(directory.toggle_emergency(unknown), None);
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_emergency_contacts_preserve_order() {
        let (directory, ids) = directory_with(&["A", "B", "C", "D"]);
        directory.toggle_emergency(ids[3]);
        directory.toggle_emergency(ids[1]);

        let names: Vec<_> = directory
            .emergency_contacts()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["B", "D"]);
        assert_eq!(directory.emergency_count(), 2);

        let others: Vec<_> = directory
            .non_emergency_contacts()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(others, vec!["A", "C"]);
    }

    #[test]
    fn test_remove_contact() {
        let (directory, ids) = directory_with(&["A", "B"]);
        let removed = directory.remove_contact(ids[0]).unwrap();
        assert_eq!(removed.name, "A");
        assert_eq!(directory.contacts()[0].name, "B");
    }

    #[test]
    fn test_subscribers_see_latest_list() {
        let directory = ContactDirectory::new();
        let rx = directory.subscribe();
        let contact = directory.add_contact("A", "9876543210", "Mother").unwrap();
        directory.toggle_emergency(contact.id());

        let seen = rx.borrow().clone();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].is_emergency);
    }
}
