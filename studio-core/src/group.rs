//! Grouping and ungrouping.
//!
//! Groups hold their members as [`GroupMember`] entries with offsets from
//! the group origin; members point back through `group_id`. Only this module
//! writes either side of that link.

use crate::align::Bounds;
use crate::element::{Element, ElementId, ElementKind, Geometry, GroupMember, Paint, Point};
use crate::scene::Scene;
use crate::transform::{normalize_degrees, rotate_point};
use crate::{CoreError, CoreResult};

/// Whether an element can join a new group.
fn is_eligible(element: &Element) -> bool {
    !element.locked && element.group_id.is_none() && !element.is_group()
}

/// Group the given elements.
///
/// Ineligible ids (unknown, locked, already grouped, or groups themselves)
/// are skipped. The group covers the members' bounding box and sits at the
/// highest member z. The selection becomes the new group.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] if fewer than two ids are eligible. The
/// scene is untouched in that case.
pub fn group(scene: &mut Scene, ids: &[ElementId]) -> CoreResult<ElementId> {
    let mut members: Vec<&Element> = Vec::new();
    for id in ids {
        if let Some(element) = scene.get(*id) {
            if is_eligible(element) && !members.iter().any(|m| m.id == *id) {
                members.push(element);
            }
        }
    }
    if members.len() < 2 {
        return Err(CoreError::Validation(format!(
            "grouping needs at least two eligible elements, got {}",
            members.len()
        )));
    }
    members.sort_by(|a, b| a.z.total_cmp(&b.z));

    let min_x = members.iter().map(|m| m.geometry.x).fold(f64::INFINITY, f64::min);
    let min_y = members.iter().map(|m| m.geometry.y).fold(f64::INFINITY, f64::min);
    let max_x = members
        .iter()
        .map(|m| m.geometry.right())
        .fold(f64::NEG_INFINITY, f64::max);
    let max_y = members
        .iter()
        .map(|m| m.geometry.bottom())
        .fold(f64::NEG_INFINITY, f64::max);
    let top_z = members.iter().map(|m| m.z).fold(f64::NEG_INFINITY, f64::max);

    let children: Vec<GroupMember> = members
        .iter()
        .map(|m| GroupMember {
            id: m.id,
            relative_x: m.geometry.x - min_x,
            relative_y: m.geometry.y - min_y,
        })
        .collect();

    let mut group = Element::new(ElementKind::Group {
        children: children.clone(),
    })
    .with_fill(Paint::None);
    group.geometry.x = min_x;
    group.geometry.y = min_y;
    group.geometry.width = max_x - min_x;
    group.geometry.height = max_y - min_y;
    group.z = top_z;

    let group_id = scene.insert(group);
    for member in &children {
        if let Some(element) = scene.get_mut(member.id) {
            element.group_id = Some(group_id);
        }
    }
    scene.set_selection(&[group_id]);
    tracing::debug!(%group_id, members = children.len(), "grouped elements");
    Ok(group_id)
}

/// Dissolve the given groups. Non-group and unknown ids are ignored.
///
/// Members keep their absolute positions. The selection becomes the
/// released members; it is left alone when nothing was ungrouped.
pub fn ungroup(scene: &mut Scene, group_ids: &[ElementId]) -> Vec<ElementId> {
    let mut released = Vec::new();
    for gid in group_ids {
        let Some(children) = scene
            .get(*gid)
            .filter(|e| e.is_group())
            .map(|e| e.children().to_vec())
        else {
            continue;
        };
        for member in children {
            if let Some(element) = scene.get_mut(member.id) {
                element.group_id = None;
                released.push(member.id);
            }
        }
        scene.remove_raw(*gid);
        tracing::debug!(group_id = %gid, "ungrouped");
    }
    if !released.is_empty() {
        scene.set_selection(&released);
    }
    released
}

/// Fix up group links before `ids` are removed from the scene.
///
/// Deleted groups release their members; deleted members leave their group.
pub(crate) fn unlink_deleted(scene: &mut Scene, ids: &[ElementId]) {
    for id in ids {
        let Some(element) = scene.get(*id) else {
            continue;
        };
        let owner = element.group_id;
        let members: Vec<ElementId> = element.children().iter().map(|m| m.id).collect();

        for member in members {
            if let Some(child) = scene.get_mut(member) {
                child.group_id = None;
            }
        }
        if let Some(owner) = owner {
            if let Some(ElementKind::Group { children }) = scene.get_mut(owner).map(|g| &mut g.kind) {
                children.retain(|m| m.id != *id);
            }
        }
    }
}

/// Recompute every member offset of a group from current positions.
pub(crate) fn rederive_offsets(scene: &mut Scene, group_id: ElementId) {
    let Some(group) = scene.get(group_id) else {
        return;
    };
    let origin = (group.geometry.x, group.geometry.y);
    let offsets: Vec<(ElementId, f64, f64)> = group
        .children()
        .iter()
        .filter_map(|m| scene.get(m.id))
        .map(|c| (c.id, c.geometry.x - origin.0, c.geometry.y - origin.1))
        .collect();

    if let Some(ElementKind::Group { children }) = scene.get_mut(group_id).map(|g| &mut g.kind) {
        for member in children.iter_mut() {
            if let Some((_, rx, ry)) = offsets.iter().find(|(id, _, _)| *id == member.id) {
                member.relative_x = *rx;
                member.relative_y = *ry;
            }
        }
    }
}

/// Current geometry of a group's unlocked members.
pub(crate) fn member_geometries(scene: &Scene, group_id: ElementId) -> Vec<(ElementId, Geometry)> {
    scene
        .get(group_id)
        .map(|g| {
            g.children()
                .iter()
                .filter_map(|m| scene.get(m.id))
                .filter(|c| !c.locked)
                .map(|c| (c.id, c.geometry))
                .collect()
        })
        .unwrap_or_default()
}

/// Carry members along after a group's frame changed from `before` to its
/// current geometry.
///
/// Each member center keeps its place in the frame's local coordinates, so
/// moves translate, resizes scale and rotations turn the members about the
/// group center. `members` holds their geometry under `before`.
pub(crate) fn follow_frame(
    scene: &mut Scene,
    group_id: ElementId,
    before: &Geometry,
    members: &[(ElementId, Geometry)],
    min_size: f64,
) {
    let Some(after) = scene.get(group_id).map(|g| g.geometry) else {
        return;
    };
    if after == *before || members.is_empty() {
        return;
    }
    let sx = if before.width > 0.0 { after.width / before.width } else { 1.0 };
    let sy = if before.height > 0.0 { after.height / before.height } else { 1.0 };
    let turn = after.rotation - before.rotation;

    for (id, start) in members {
        let local = rotate_point(start.center(), before.center(), -before.rotation);
        let scaled = Point::new(
            after.x + (local.x - before.x) * sx,
            after.y + (local.y - before.y) * sy,
        );
        let center = rotate_point(scaled, after.center(), after.rotation);
        let width = (start.width * sx).max(min_size);
        let height = (start.height * sy).max(min_size);
        if let Some(child) = scene.get_mut(*id) {
            child.geometry = Geometry {
                x: center.x - width / 2.0,
                y: center.y - height / 2.0,
                width,
                height,
                rotation: normalize_degrees(start.rotation + turn),
            };
        }
    }
    rederive_offsets(scene, group_id);
}

/// Refit the group owning `id` to its members after `id` moved on its own.
///
/// The group becomes the unrotated bounding box of its members.
pub(crate) fn refresh_owner(scene: &mut Scene, id: ElementId) {
    let Some(group_id) = scene.get(id).and_then(|e| e.group_id) else {
        return;
    };
    let Some(bounds) = scene.get(group_id).and_then(|g| {
        Bounds::union(
            g.children()
                .iter()
                .filter_map(|m| scene.get(m.id))
                .map(|c| Bounds::from_geometry(&c.geometry)),
        )
    }) else {
        return;
    };
    if let Some(group) = scene.get_mut(group_id) {
        group.geometry = Geometry::new(bounds.x, bounds.y, bounds.width, bounds.height);
    }
    rederive_offsets(scene, group_id);
}

/// Move an element by a delta. Groups carry their unlocked members along.
pub(crate) fn translate(scene: &mut Scene, id: ElementId, dx: f64, dy: f64) {
    let members: Vec<ElementId> = match scene.get_mut(id) {
        Some(element) if !element.locked => {
            element.geometry.x += dx;
            element.geometry.y += dy;
            element.children().iter().map(|m| m.id).collect()
        }
        _ => return,
    };
    if members.is_empty() {
        return;
    }
    for member in members {
        if let Some(child) = scene.get_mut(member) {
            if !child.locked {
                child.geometry.x += dx;
                child.geometry.y += dy;
            }
        }
    }
    rederive_offsets(scene, id);
}
