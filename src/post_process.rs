//! Post-pass over the intermediate store
//!
//! Runs once every document of a session has been read. Each step resolves
//! one kind of deferred construct against the complete registry and sid
//! tree and mutates the held objects accordingly. Unresolvable entries are
//! collected instead of stopping the pass; they are reported as one batch
//! before the held objects go to the writer.

use crate::config::ObjectFlags;
use crate::error::{Error, ErrorContext, Result, Severity};
use crate::intermediate::{ControllerInfo, InstanceControllerData, SkinControllerKey, SkinInfo};
use crate::model::{
    AnimationBinding, AnimationClass, AnimationList, ClassId, Controller, FileId, Formula,
    JointAxisBinding, SkinController, UniqueId,
};
use crate::parser::LoadContext;
use crate::registry::fragment_id;
use crate::sid_tree::{SidAddress, SidTarget};
use std::collections::HashMap;
use url::Url;

/// A resolution failure and where the unresolved construct was found
type Problem = (Error, ErrorContext);

/// Controllers may be stacked (a skin over a morph); deeper chains are cycles
const MAX_CONTROLLER_DEPTH: usize = 8;

/// Resolve everything held in `ctx.store` and write the held objects
///
/// Fails only if the error handler asked to stop or the writer failed.
pub(crate) fn run(ctx: &mut LoadContext<'_>) -> Result<()> {
    let mut problems = Vec::new();

    bind_materials(ctx);
    bind_controllers(ctx, &mut problems)?;
    bind_animations(ctx, &mut problems)?;
    bind_joint_axes(ctx, &mut problems);
    let formulas = resolve_formulas(ctx, &mut problems);
    check_references(ctx, &mut problems);

    if !problems.is_empty() {
        tracing::debug!(count = problems.len(), "unresolved references");
    }
    for (error, context) in problems {
        if !ctx.report_with_context(Severity::Error, &error, context) {
            return Err(Error::Aborted(error.to_string()));
        }
    }

    write_held(ctx, formulas)?;
    ctx.store.clear();
    Ok(())
}

/// Object behind a source URI, following morph controllers to their morph
fn source_object(ctx: &LoadContext<'_>, uri: &Url) -> UniqueId {
    let id = ctx.registry.lookup_id(uri);
    if id.class_id == ClassId::Controller {
        return match ctx.store.controllers.get(&id) {
            Some(ControllerInfo::Morph { morph, .. }) => *morph,
            _ => UniqueId::INVALID,
        };
    }
    id
}

/// Geometry a controller ultimately deforms
fn controller_geometry(ctx: &LoadContext<'_>, controller: UniqueId) -> Option<UniqueId> {
    let mut current = controller;
    for _ in 0..MAX_CONTROLLER_DEPTH {
        let source = match ctx.store.controllers.get(&current)? {
            ControllerInfo::Skin(skin) => &skin.source,
            ControllerInfo::Morph { source, .. } => source,
        };
        let id = ctx.registry.lookup_id(source);
        match id.class_id {
            ClassId::Geometry => return Some(id),
            ClassId::Controller => current = id,
            _ => return None,
        }
    }
    None
}

/// Map `<instance_material>` symbols to the material ids of the geometry
fn bind_materials(ctx: &mut LoadContext<'_>) {
    let view: &LoadContext<'_> = ctx;
    let geometries: HashMap<UniqueId, UniqueId> = view
        .store
        .controllers
        .keys()
        .filter_map(|&controller| Some((controller, controller_geometry(view, controller)?)))
        .collect();
    let materials = std::mem::take(&mut ctx.store.geometry_materials);

    let mut bound = 0usize;
    ctx.store.for_each_node_mut(&mut |node| {
        let instances = node
            .instance_geometries
            .iter_mut()
            .map(|instance| (instance.geometry, &mut instance.material_bindings))
            .chain(node.instance_controllers.iter_mut().filter_map(|instance| {
                let geometry = *geometries.get(&instance.controller)?;
                Some((geometry, &mut instance.material_bindings))
            }));
        for (geometry, bindings) in instances {
            let Some(info) = materials.get(&geometry) else {
                continue;
            };
            for binding in bindings.iter_mut() {
                binding.material_id = info.get(&binding.symbol);
                if binding.material_id.is_some() {
                    bound += 1;
                } else {
                    tracing::trace!(symbol = %binding.symbol, %geometry, "symbol not used by any primitive");
                }
            }
        }
    });
    tracing::debug!(bound, "bound material symbols");
}

/// Resolve skin joints per instance and point every instance at its
/// runtime controller
fn bind_controllers(ctx: &mut LoadContext<'_>, problems: &mut Vec<Problem>) -> Result<()> {
    let groups = std::mem::take(&mut ctx.store.instance_controllers);
    for (controller, instances) in groups {
        let Some(info) = ctx.store.controllers.get(&controller).cloned() else {
            // Unknown controllers are reported by the reference check
            continue;
        };
        for instance in &instances {
            let bound = match &info {
                ControllerInfo::Morph { morph, .. } => Some(*morph),
                ControllerInfo::Skin(skin) => bind_skin(ctx, controller, skin, instance, problems)?,
            };
            if let Some(bound) = bound
                && let Some(node) = ctx.store.find_node_mut(instance.instance.node)
                && let Some(target) = node.instance_controllers.get_mut(instance.instance.index)
            {
                target.controller = bound;
            }
        }
    }
    tracing::debug!(count = ctx.store.skin_controllers.len(), "bound skin controllers");
    Ok(())
}

fn bind_skin(
    ctx: &mut LoadContext<'_>,
    controller: UniqueId,
    skin: &SkinInfo,
    instance: &InstanceControllerData,
    problems: &mut Vec<Problem>,
) -> Result<Option<UniqueId>> {
    let source = source_object(ctx, &skin.source);
    if !source.is_valid() {
        return Ok(None);
    }

    let mut joints = Vec::with_capacity(skin.joint_names.len());
    for name in &skin.joint_names {
        match find_joint(ctx, controller, skin, instance, name) {
            Some(joint) => joints.push(joint),
            None => {
                problems.push((Error::dangling("skin joint", name), instance.context.clone()));
                return Ok(None);
            }
        }
    }

    let key = SkinControllerKey {
        source,
        joints,
        content: skin.content.clone(),
    };
    if let Some(existing) = ctx.store.skin_controllers.get(&key) {
        tracing::trace!(%existing, "reusing skin controller");
        return Ok(Some(existing));
    }

    let id = ctx
        .registry
        .create_anonymous_id(ClassId::SkinController, controller.file_id);
    ctx.store.skin_controllers.insert(key.clone(), id);
    if ctx.wants(ObjectFlags::CONTROLLER) {
        let ok = ctx.writer.write_controller(Controller::Skin(SkinController {
            unique_id: id,
            skin_controller_data: skin.data,
            source: key.source,
            joints: key.joints,
        }));
        ctx.check_written(ok, "skin controller")?;
    }
    Ok(Some(id))
}

/// Node a joint name stands for
///
/// Sid joints are searched below each skeleton root in turn, then by id;
/// id joints are looked up in the instance's document, then the
/// controller's.
fn find_joint(
    ctx: &LoadContext<'_>,
    controller: UniqueId,
    skin: &SkinInfo,
    instance: &InstanceControllerData,
    name: &str,
) -> Option<UniqueId> {
    let tree = &ctx.sid_tree;
    let by_id = || {
        tree.find_by_id(instance.instance.node.file_id, name)
            .or_else(|| tree.find_by_id(controller.file_id, name))
    };
    let node = if skin.joints_are_ids {
        by_id()
    } else {
        instance
            .skeleton_roots
            .iter()
            .find_map(|root| {
                let id = fragment_id(root)?;
                let start = tree.find_by_id(ctx.registry.lookup_file_id(root), &id)?;
                tree.find_sid_from(start, name)
            })
            .or_else(by_id)
    }?;
    match tree.target(node) {
        SidTarget::Object(id) if id.class_id == ClassId::Node => Some(id),
        _ => None,
    }
}

/// Component of a transformation an address selects
fn animation_class(address: &SidAddress) -> AnimationClass {
    match (address.member.as_deref(), address.indices.as_slice()) {
        (Some("X"), _) => AnimationClass::X,
        (Some("Y"), _) => AnimationClass::Y,
        (Some("Z"), _) => AnimationClass::Z,
        (Some("ANGLE"), _) => AnimationClass::Angle,
        (None, [row, column]) => AnimationClass::MatrixElement {
            row: *row,
            column: *column,
        },
        (None, [index]) => AnimationClass::Element(*index),
        _ => AnimationClass::All,
    }
}

/// What an address in document `file_id` points at
fn resolve_target(ctx: &LoadContext<'_>, file_id: FileId, address: &str) -> Result<SidTarget> {
    let address = SidAddress::parse(address)?;
    Ok(ctx
        .sid_tree
        .resolve(file_id, None, &address)
        .map(|node| ctx.sid_tree.target(node))
        .unwrap_or_default())
}

/// Group channels per node transformation into animation lists
fn bind_animations(ctx: &mut LoadContext<'_>, problems: &mut Vec<Problem>) -> Result<()> {
    let channels = std::mem::take(&mut ctx.store.channels);
    let mut lists: Vec<((UniqueId, usize), Vec<AnimationBinding>)> = Vec::new();
    let mut positions: HashMap<(UniqueId, usize), usize> = HashMap::new();

    for channel in channels {
        if !ctx.registry.is_defined(channel.animation) {
            continue;
        }
        let address = match SidAddress::parse(&channel.target) {
            Ok(address) => address,
            Err(err) => {
                problems.push((err, channel.context));
                continue;
            }
        };
        let target = ctx
            .sid_tree
            .resolve(channel.file_id, None, &address)
            .map(|node| ctx.sid_tree.target(node));
        let Some(SidTarget::Transformation { node, index }) = target else {
            problems.push((Error::dangling("channel", &channel.target), channel.context));
            continue;
        };
        let binding = AnimationBinding {
            animation: channel.animation,
            class: animation_class(&address),
        };
        match positions.get(&(node, index)) {
            Some(&position) => lists[position].1.push(binding),
            None => {
                positions.insert((node, index), lists.len());
                lists.push(((node, index), vec![binding]));
            }
        }
    }

    for ((node, index), bindings) in lists {
        let id = ctx
            .registry
            .create_anonymous_id(ClassId::AnimationList, node.file_id);
        if let Some(transformation) = ctx
            .store
            .find_node_mut(node)
            .and_then(|n| n.transformations.get_mut(index))
        {
            transformation.animation_list = Some(id);
        }
        if ctx.wants(ObjectFlags::ANIMATION_LIST) {
            let ok = ctx.writer.write_animation_list(AnimationList {
                unique_id: id,
                bindings,
            });
            ctx.check_written(ok, "animation list")?;
        }
    }
    Ok(())
}

/// Attach `<bind_joint_axis>` bindings to their kinematics scenes
fn bind_joint_axes(ctx: &mut LoadContext<'_>, problems: &mut Vec<Problem>) {
    let bindings = std::mem::take(&mut ctx.store.joint_axis_bindings);
    for pending in bindings {
        let target = match resolve_target(ctx, pending.file_id, &pending.target) {
            Ok(target) => target,
            Err(err) => {
                problems.push((err, pending.context));
                continue;
            }
        };
        let SidTarget::Transformation { node, index } = target else {
            problems.push((
                Error::dangling("bind_joint_axis", &pending.target),
                pending.context,
            ));
            continue;
        };
        let axis = match resolve_target(ctx, pending.file_id, &pending.axis) {
            Ok(axis) => axis,
            Err(err) => {
                problems.push((err, pending.context));
                continue;
            }
        };
        let SidTarget::JointAxis {
            joint,
            index: axis_index,
        } = axis
        else {
            problems.push((Error::dangling("bind_joint_axis", &pending.axis), pending.context));
            continue;
        };

        if let Some(scene) = ctx
            .store
            .kinematics_scenes
            .iter_mut()
            .find(|scene| scene.unique_id == pending.scene)
        {
            scene.bindings.push(JointAxisBinding {
                node,
                transformation_index: index,
                joint,
                axis_index,
                value: pending.value,
            });
        }
    }
}

/// Fill in the formulas each held formula refers to
fn resolve_formulas(ctx: &mut LoadContext<'_>, problems: &mut Vec<Problem>) -> Vec<Formula> {
    let pending = std::mem::take(&mut ctx.store.formulas);
    let mut formulas = Vec::with_capacity(pending.len());
    for entry in pending {
        let mut formula = entry.formula;
        for uri in &entry.references {
            let id = ctx.registry.lookup_id(uri);
            if id.class_id == ClassId::Formula && ctx.registry.is_defined(id) {
                formula.referenced_formulas.push(id);
            } else if !id.is_valid() || !ctx.registry.is_defined(id) {
                if ctx.is_loaded(ctx.registry.lookup_file_id(uri)) {
                    problems.push((Error::dangling("csymbol", uri), entry.context.clone()));
                }
            } else {
                tracing::trace!(%uri, class = %id.class_id, "csymbol names a non-formula element");
            }
        }
        formulas.push(formula);
    }
    formulas
}

/// Report references whose target was never defined
///
/// Targets in documents that were never read (external references
/// disabled) are not checked.
fn check_references(ctx: &mut LoadContext<'_>, problems: &mut Vec<Problem>) {
    let references = std::mem::take(&mut ctx.store.pending_references);
    for reference in references {
        let file_id = ctx.registry.lookup_file_id(&reference.uri);
        if !ctx.is_loaded(file_id) {
            tracing::trace!(uri = %reference.uri, "skipping reference into unread document");
            continue;
        }
        let id = ctx.registry.lookup_id(&reference.uri);
        if !id.is_valid() || !ctx.registry.is_defined(id) {
            problems.push((
                Error::dangling(reference.element, &reference.uri),
                reference.context,
            ));
        }
    }
}

/// Hand over everything that waited for the post-pass
fn write_held(ctx: &mut LoadContext<'_>, formulas: Vec<Formula>) -> Result<()> {
    for scene in std::mem::take(&mut ctx.store.visual_scenes) {
        let ok = ctx.writer.write_visual_scene(scene);
        ctx.check_written(ok, "visual scene")?;
    }
    for library in std::mem::take(&mut ctx.store.library_nodes) {
        let ok = ctx.writer.write_library_nodes(library);
        ctx.check_written(ok, "library nodes")?;
    }
    for formula in formulas {
        let ok = ctx.writer.write_formula(formula);
        ctx.check_written(ok, "formula")?;
    }
    for scene in std::mem::take(&mut ctx.store.kinematics_scenes) {
        let ok = ctx.writer.write_kinematics_scene(scene);
        ctx.check_written(ok, "kinematics scene")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(address: &str) -> AnimationClass {
        animation_class(&SidAddress::parse(address).unwrap())
    }

    #[test]
    fn test_animation_class_from_address() {
        assert_eq!(class("box/translate.X"), AnimationClass::X);
        assert_eq!(class("box/rotateY.ANGLE"), AnimationClass::Angle);
        assert_eq!(
            class("box/transform(1)(3)"),
            AnimationClass::MatrixElement { row: 1, column: 3 }
        );
        assert_eq!(class("box/rotateY(3)"), AnimationClass::Element(3));
        assert_eq!(class("box/scale"), AnimationClass::All);
    }
}
