//! Playlist : séquence ordonnée de pistes et pointeur de sélection
//!
//! Structure purement en mémoire. Les effets de bord (handles, stores,
//! surface de lecture) sont orchestrés par la [`Session`](crate::Session).

pub mod navigation;

use crate::track::TrackEntry;

/// Effet d'une suppression sur la sélection courante
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionChange {
    /// La piste sélectionnée a été retirée, plus rien n'est sélectionné
    Cleared,
    /// La piste retirée précédait la sélection, l'index a été décrémenté
    Shifted,
    Unchanged,
}

/// État de la playlist
#[derive(Debug, Default)]
pub struct Playlist {
    entries: Vec<TrackEntry>,
    current: Option<usize>,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_entries(entries: Vec<TrackEntry>) -> Self {
        Self {
            entries,
            current: None,
        }
    }

    pub fn entries(&self) -> &[TrackEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&TrackEntry> {
        self.entries.get(index)
    }

    /// Index sélectionné, `None` quand rien n'est sélectionné
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<&TrackEntry> {
        self.current.and_then(|index| self.entries.get(index))
    }

    /// Sélectionne `index` s'il est valide
    pub(crate) fn set_current(&mut self, index: usize) -> Option<&TrackEntry> {
        if index >= self.entries.len() {
            return None;
        }
        self.current = Some(index);
        self.entries.get(index)
    }

    /// Ajoute une entrée en fin de séquence et retourne son index
    pub(crate) fn push(&mut self, entry: TrackEntry) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    /// Retire l'entrée à `index` en maintenant la sélection sur la même piste
    pub(crate) fn remove(&mut self, index: usize) -> Option<(TrackEntry, SelectionChange)> {
        if index >= self.entries.len() {
            return None;
        }
        let removed = self.entries.remove(index);

        let change = match self.current {
            Some(current) if current == index => {
                self.current = None;
                SelectionChange::Cleared
            }
            Some(current) if index < current => {
                self.current = Some(current - 1);
                SelectionChange::Shifted
            }
            _ => SelectionChange::Unchanged,
        };

        Some((removed, change))
    }

    /// Vide la séquence et retourne les entrées retirées
    pub(crate) fn drain(&mut self) -> Vec<TrackEntry> {
        self.current = None;
        std::mem::take(&mut self.entries)
    }
}
