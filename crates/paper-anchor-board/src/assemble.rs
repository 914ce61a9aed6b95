use crate::board::{MarkerRoleMap, Quadrilateral};
use crate::detector::DetectionFailure;
use paper_anchor_aruco::MarkerObservation;

/// Place each marker's designated corner into its slot.
///
/// Fails unless the observed ids are exactly the board's ids, each once.
pub fn assemble_quadrilateral(
    observations: &[MarkerObservation],
    role_map: &MarkerRoleMap,
) -> Result<Quadrilateral, DetectionFailure> {
    let mut slots = [None; MarkerRoleMap::MARKER_COUNT];
    let mut seen = [false; MarkerRoleMap::MARKER_COUNT];

    for obs in observations {
        let role = role_map
            .role(obs.id)
            .ok_or(DetectionFailure::UnrecognizedId(obs.id))?;
        if std::mem::replace(&mut seen[obs.id as usize], true) {
            return Err(DetectionFailure::DuplicateId(obs.id));
        }
        slots[role.slot.index()] = Some(obs.corners[role.marker_corner.index()]);
    }

    let missing: Vec<u32> = (0..MarkerRoleMap::MARKER_COUNT as u32)
        .filter(|&id| !seen[id as usize])
        .collect();
    if !missing.is_empty() {
        return Err(DetectionFailure::MissingIds {
            missing,
            observed: observations.iter().map(|o| o.id).collect(),
        });
    }

    // All ids seen once and the role map is a bijection, so every slot is set.
    let [Some(tl), Some(tr), Some(br), Some(bl)] = slots else {
        return Err(DetectionFailure::MissingIds {
            missing: Vec::new(),
            observed: observations.iter().map(|o| o.id).collect(),
        });
    };
    let corners = [tl, tr, br, bl];
    Ok(Quadrilateral::from_slots(corners))
}
