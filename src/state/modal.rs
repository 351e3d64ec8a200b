//! Open/closed flags for dialogs

/// A dialog that is either open or closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modal {
    open: bool,
}

impl Modal {
    pub fn new(open: bool) -> Self {
        Self { open }
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn toggle(&mut self) {
        self.open = !self.open;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

/// A dialog that carries the record it was opened for.
///
/// `close` keeps the data so a closing animation can still render it;
/// `close_and_clear` drops it.
#[derive(Debug, Clone, PartialEq)]
pub struct ModalWithData<T> {
    modal: Modal,
    data: Option<T>,
}

impl<T> Default for ModalWithData<T> {
    fn default() -> Self {
        Self {
            modal: Modal::default(),
            data: None,
        }
    }
}

impl<T> ModalWithData<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_with(&mut self, data: T) {
        self.data = Some(data);
        self.modal.open();
    }

    pub fn close(&mut self) {
        self.modal.close();
    }

    pub fn close_and_clear(&mut self) {
        self.modal.close();
        self.data = None;
    }

    pub fn is_open(&self) -> bool {
        self.modal.is_open()
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }
}
