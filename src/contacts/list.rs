use crate::api::gateway::ContactGateway;
use crate::api::models::Contact;
use crate::query::{Query, QueryClient, QueryKey, RetryPolicy};

/// Case-insensitive on the name, verbatim on the phone. Empty matches all.
pub fn matches(contact: &Contact, search: &str) -> bool {
    if search.is_empty() {
        return true;
    }
    contact.name.to_lowercase().contains(&search.to_lowercase()) || contact.phone.contains(search)
}

pub fn filter<'a>(contacts: &'a [Contact], search: &str) -> Vec<&'a Contact> {
    contacts.iter().filter(|c| matches(c, search)).collect()
}

/// Up to two upper-cased initials, one per word.
pub fn initials(name: &str) -> String {
    name.split(' ')
        .filter_map(|w| w.chars().next())
        .flat_map(char::to_uppercase)
        .take(2)
        .collect()
}

pub const AVATAR_PALETTE_LEN: usize = 12;

/// Stable palette slot for a name: sum of its code points.
pub fn avatar_palette_index(name: &str) -> usize {
    let hash: u64 = name.chars().map(|c| c as u64).sum();
    (hash % AVATAR_PALETTE_LEN as u64) as usize
}

/// The sidebar's view model: the cached contacts query plus a search term
/// that lives only as long as the view.
pub struct ContactListView {
    query: Query<Vec<Contact>>,
    search: String,
}

impl Default for ContactListView {
    fn default() -> Self {
        Self::new()
    }
}

impl ContactListView {
    pub fn new() -> Self {
        Self {
            query: Query::new(QueryKey::Contacts),
            search: String::new(),
        }
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
    }

    pub fn query(&self) -> &Query<Vec<Contact>> {
        &self.query
    }

    pub fn needs_refresh(&self, queries: &QueryClient) -> bool {
        self.query.is_stale(queries)
    }

    /// Stores a fetch that started at `generation`.
    pub fn apply(&mut self, generation: u64, result: Result<Vec<Contact>, crate::error::ApiError>) {
        self.query.settle(generation, result);
    }

    /// Whether the collection was invalidated while a fetch that started at
    /// `generation` was in flight. Only then does the fetch get repeated; a
    /// plain failure stays on screen until the next invalidation.
    pub fn superseded(queries: &QueryClient, generation: u64) -> bool {
        queries.generation(QueryKey::Contacts) != generation
    }

    /// Refetches when the collection was invalidated since the last fetch.
    pub async fn refresh<G: ContactGateway>(
        &mut self,
        gateway: &G,
        queries: &QueryClient,
        retry: RetryPolicy,
    ) {
        while self.needs_refresh(queries) {
            let generation = queries.generation(QueryKey::Contacts);
            let result = retry.run(|| gateway.list()).await;
            self.apply(generation, result);
            if !Self::superseded(queries, generation) {
                break;
            }
        }
    }

    /// Contacts to render, in backend order.
    pub fn visible(&self) -> Vec<&Contact> {
        match self.query.data() {
            Some(all) => filter(all, &self.search),
            None => Vec::new(),
        }
    }
}
