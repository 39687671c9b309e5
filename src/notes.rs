use crate::error::{TrackerError, TrackerResult};
use crate::persistence::{TableStore, load_records, save_records};
use crate::records::Note;
use log::info;

/// Free-text note per student, one row each.
pub struct NoteStore<'a> {
    store: &'a dyn TableStore,
}

impl<'a> NoteStore<'a> {
    pub fn new(store: &'a dyn TableStore) -> Self {
        Self { store }
    }

    pub fn get_note(&self, student: &str) -> TrackerResult<Option<String>> {
        let notes: Vec<Note> = load_records(self.store)?;
        Ok(notes
            .into_iter()
            .find(|note| note.student == student.trim())
            .map(|note| note.note))
    }

    /// Inserts or overwrites the student's note. Duplicate rows left by manual
    /// edits collapse into the first one.
    pub fn save_note(&self, student: &str, text: &str) -> TrackerResult<()> {
        let student = student.trim();
        if student.is_empty() {
            return Err(TrackerError::MissingStudent);
        }
        let mut notes: Vec<Note> = load_records(self.store)?;
        let mut found = false;
        notes.retain_mut(|note| {
            if note.student != student {
                return true;
            }
            if found {
                return false;
            }
            found = true;
            note.note = text.to_string();
            true
        });
        if !found {
            notes.push(Note {
                student: student.to_string(),
                note: text.to_string(),
            });
        }
        save_records(self.store, &notes)?;
        info!("event=save_note student={student} created={}", !found);
        Ok(())
    }
}
