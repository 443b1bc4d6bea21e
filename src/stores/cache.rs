use desidia_schema::Identified;

/// A cached list plus the "current" entity, kept consistent by id.
#[derive(Debug, Clone)]
pub struct EntityCache<T> {
    list: Vec<T>,
    current: Option<T>,
}

impl<T> Default for EntityCache<T> {
    fn default() -> Self {
        Self {
            list: Vec::new(),
            current: None,
        }
    }
}

impl<T: Identified + Clone> EntityCache<T> {
    pub fn list(&self) -> &[T] {
        &self.list
    }

    pub fn current(&self) -> Option<&T> {
        self.current.as_ref()
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_ref().map(Identified::id)
    }

    pub fn is_current(&self, id: &str) -> bool {
        self.current_id() == Some(id)
    }

    pub fn find(&self, id: &str) -> Option<&T> {
        self.list.iter().find(|item| item.id() == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut T> {
        self.list.iter_mut().find(|item| item.id() == id)
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn set_list(&mut self, items: Vec<T>) {
        self.list = items;
    }

    pub fn set_current(&mut self, item: Option<T>) {
        self.current = item;
    }

    pub fn push(&mut self, item: T) {
        self.list.push(item);
    }

    pub fn push_front(&mut self, item: T) {
        self.list.insert(0, item);
    }

    /// Replace the list entry and the current entity sharing `item`'s id.
    /// Returns whether any copy was replaced.
    pub fn replace(&mut self, item: &T) -> bool {
        let mut replaced = false;
        if let Some(slot) = self.find_mut(item.id()) {
            *slot = item.clone();
            replaced = true;
        }
        if self.is_current(item.id()) {
            self.current = Some(item.clone());
            replaced = true;
        }
        replaced
    }

    /// Apply `f` to the list entry and the current entity with `id`.
    pub fn modify(&mut self, id: &str, mut f: impl FnMut(&mut T)) -> bool {
        let mut touched = false;
        if let Some(item) = self.find_mut(id) {
            f(item);
            touched = true;
        }
        if let Some(current) = self.current.as_mut().filter(|c| c.id() == id) {
            f(current);
            touched = true;
        }
        touched
    }

    /// Drop the entity from the list; clears `current` when it matches.
    /// Returns whether the current entity was removed.
    pub fn remove(&mut self, id: &str) -> bool {
        self.list.retain(|item| item.id() != id);
        if self.is_current(id) {
            self.current = None;
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.list.clear();
        self.current = None;
    }
}
