use std::collections::{HashSet, VecDeque};

use crate::container::Container;

/// Child indices leading from the root page to a page.
pub(crate) type PagePath = Vec<usize>;

/// How a page treats the locations its container lists. Fixed when the page
/// is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PageMode {
    /// Listed locations are containers that become child pages
    Containers,
    /// Listed locations hold data and are queued for fetching
    Leaves,
}

/// State shared by all pages of one subscription.
#[derive(Debug, Default)]
pub(crate) struct StreamShared {
    pub(crate) inbox: Option<String>,
    pub(crate) pending: VecDeque<String>,
}

/// Asynchronous work requested by an interpretation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Dispatch {
    /// Re-fetch the container of an existing page
    Refresh(PagePath),
    /// Fetch a newly listed location and attach it as a child page
    Discover { parent: PagePath, location: String },
}

#[derive(Debug)]
pub(crate) struct Page {
    location: String,
    container: Container,
    mode: PageMode,
    seen: HashSet<String>,
    children: Vec<Page>,
}

impl Page {
    pub(crate) fn new(location: String, container: Container) -> Page {
        let mode = if container.container_of_containers() {
            PageMode::Containers
        } else {
            PageMode::Leaves
        };
        Page {
            location,
            container,
            mode,
            seen: HashSet::new(),
            children: vec![],
        }
    }

    pub(crate) fn location(&self) -> &str {
        &self.location
    }

    pub(crate) fn mode(&self) -> PageMode {
        self.mode
    }

    pub(crate) fn seen(&self) -> &HashSet<String> {
        &self.seen
    }

    pub(crate) fn children(&self) -> &[Page] {
        &self.children
    }

    /// Swap in a freshly fetched container. The mode stays as it was.
    pub(crate) fn replace_container(&mut self, container: Container) {
        self.container = container;
    }

    /// Attach a child page and return its index.
    pub(crate) fn attach(&mut self, child: Page) -> usize {
        self.children.push(child);
        self.children.len() - 1
    }

    pub(crate) fn page_mut(&mut self, path: &[usize]) -> Option<&mut Page> {
        let mut page = self;
        for &index in path {
            page = page.children.get_mut(index)?;
        }
        Some(page)
    }

    pub(crate) fn page(&self, path: &[usize]) -> Option<&Page> {
        let mut page = self;
        for &index in path {
            page = page.children.get(index)?;
        }
        Some(page)
    }

    /// Walk the current container. Locations are marked seen before any
    /// dispatch for them is returned, so a later pass never repeats one.
    pub(crate) fn interpret(&mut self, path: &[usize], shared: &mut StreamShared) -> Vec<Dispatch> {
        match self.mode {
            PageMode::Containers => self.interpret_containers(path, shared),
            PageMode::Leaves => {
                for location in self.container.pages() {
                    if self.seen.insert(location.to_string()) {
                        shared.pending.push_back(location.to_string());
                    }
                }
                vec![]
            }
        }
    }

    fn interpret_containers(&mut self, path: &[usize], shared: &mut StreamShared) -> Vec<Dispatch> {
        if let Some(inbox) = self.container.inbox() {
            shared.inbox = Some(inbox.to_string());
        }
        let child_path = |index: usize| {
            let mut child = path.to_vec();
            child.push(index);
            child
        };
        let mut dispatches: Vec<_> = (0..self.children.len())
            .map(|index| Dispatch::Refresh(child_path(index)))
            .collect();
        for location in self.container.pages() {
            if shared.inbox.as_deref() == Some(location) {
                continue;
            }
            if !self.seen.insert(location.to_string()) {
                continue;
            }
            dispatches.push(Dispatch::Discover {
                parent: path.to_vec(),
                location: location.to_string(),
            });
        }
        dispatches
    }
}
