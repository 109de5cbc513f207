//! Règles de navigation suivant / précédent

use rand::Rng;

/// Décision prise par `advance`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Select(usize),
    /// Arrêt manuel en fin de playlist : pause et retour à zéro
    StopAndRewind,
    Stay,
}

/// Paramètres de navigation
#[derive(Debug, Clone, Copy, Default)]
pub struct NavigationModes {
    pub loop_playlist: bool,
    pub shuffle: bool,
}

/// Calcule la piste suivante
///
/// En mode aléatoire, une fin de piste naturelle (`automatic`) tire
/// uniformément parmi toutes les pistes sauf la courante. Sinon on avance
/// séquentiellement, en rebouclant si la playlist boucle.
pub fn next_index<R: Rng>(
    len: usize,
    current: Option<usize>,
    modes: NavigationModes,
    automatic: bool,
    rng: &mut R,
) -> Advance {
    if len == 0 {
        return Advance::Stay;
    }

    if modes.shuffle && automatic {
        let candidates: Vec<usize> = (0..len).filter(|i| Some(*i) != current).collect();
        if !candidates.is_empty() {
            return Advance::Select(candidates[rng.random_range(0..candidates.len())]);
        }
    }

    let next = current.map_or(0, |index| index + 1);
    if next < len {
        Advance::Select(next)
    } else if modes.loop_playlist {
        Advance::Select(0)
    } else if !automatic {
        Advance::StopAndRewind
    } else {
        Advance::Stay
    }
}

/// Calcule la piste précédente, `None` si on reste sur place
pub fn previous_index(len: usize, current: Option<usize>, loop_playlist: bool) -> Option<usize> {
    if len == 0 {
        return None;
    }
    match current {
        Some(index) if index > 0 => Some(index - 1),
        _ if loop_playlist => Some(len - 1),
        _ => None,
    }
}
