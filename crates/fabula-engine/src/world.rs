use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::component::ComponentKind;
use crate::entity::{Entity, EntityId, ParentLink};
use crate::error::{EngineError, EngineResult};

/// The arena owning every live entity.
///
/// All containment is expressed through ids: a parent's `Children`
/// collection maps aliases to child ids, and each child carries a
/// [`ParentLink`] back. Nothing in here owns an `Entity` twice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct World {
    entities: HashMap<EntityId, Entity>,
}

impl World {
    /// An empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity, returning its id.
    pub fn insert(&mut self, entity: Entity) -> EntityId {
        let id = entity.id;
        self.entities.insert(id, entity);
        id
    }

    /// Borrow an entity.
    pub fn get(&self, id: EntityId) -> EngineResult<&Entity> {
        self.entities.get(&id).ok_or(EngineError::EntityNotFound(id))
    }

    /// Mutably borrow an entity.
    pub fn get_mut(&mut self, id: EntityId) -> EngineResult<&mut Entity> {
        self.entities
            .get_mut(&id)
            .ok_or(EngineError::EntityNotFound(id))
    }

    /// Whether an entity exists.
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Remove an entity from the arena, detaching it from its parent
    /// first. Children of the removed entity are left in place with
    /// dangling parent links cleared.
    pub fn remove(&mut self, id: EntityId) -> EngineResult<()> {
        self.detach(id)?;
        if let Some(removed) = self.entities.remove(&id) {
            for kind in removed.components.child_bearing_kinds() {
                if let Some(children) = removed.components.children(kind) {
                    for child in children.ids() {
                        if let Some(child) = self.entities.get_mut(&child) {
                            child.parent = None;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the world is empty.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate over all entity ids.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    /// Place `child` inside the given component of `parent`, indexing the
    /// child's aliases and recording the back-link. The child is detached
    /// from any previous parent first. Attaching an entity under itself
    /// or one of its own descendants is an error.
    pub fn attach(
        &mut self,
        parent: EntityId,
        kind: ComponentKind,
        child: EntityId,
    ) -> EngineResult<()> {
        // Walk the parent's ancestry before touching anything; a cycle
        // here would make every recursive traversal unbounded.
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                return Err(EngineError::ContainmentCycle {
                    entity: self.get(child)?.name.clone(),
                });
            }
            cursor = self.get(id)?.parent.map(|link| link.entity);
        }

        self.detach(child)?;

        let aliases = self.get(child)?.aliases.clone();
        let parent_entity = self.get_mut(parent)?;
        let parent_name = parent_entity.name.clone();
        let children = parent_entity
            .components
            .children_mut(kind)
            .ok_or(EngineError::MissingComponent {
                entity: parent_name,
                component: kind,
            })?;
        children.insert(child, &aliases);

        self.get_mut(child)?.parent = Some(ParentLink {
            entity: parent,
            component: kind,
        });
        Ok(())
    }

    /// Remove `child` from its parent's collection, if it has one, and
    /// clear the back-link. A parentless child is a no-op.
    pub fn detach(&mut self, child: EntityId) -> EngineResult<()> {
        let Some(link) = self.get(child)?.parent else {
            return Ok(());
        };
        if let Ok(parent) = self.get_mut(link.entity)
            && let Some(children) = parent.components.children_mut(link.component)
        {
            children.remove(child);
        }
        self.get_mut(child)?.parent = None;
        Ok(())
    }

    /// Recursively clone an entity subtree under fresh ids.
    ///
    /// The copy starts detached (no parent), its rules stay shared via
    /// `Arc`, and every child collection is rebuilt around the cloned
    /// children so the copy and the original never alias each other.
    pub fn deep_copy(&mut self, id: EntityId) -> EngineResult<EntityId> {
        let mut copy = self.get(id)?.clone();
        copy.id = EntityId::new();
        copy.parent = None;

        let mut subtrees = Vec::new();
        for kind in copy.components.child_bearing_kinds() {
            if let Some(children) = copy.components.children_mut(kind) {
                let ids: Vec<EntityId> = children.ids().collect();
                let mut fresh = crate::children::Children::new(children.prefix.clone());
                fresh.revealed = children.revealed;
                *children = fresh;
                subtrees.push((kind, ids));
            }
        }

        let copy_id = self.insert(copy);
        for (kind, ids) in subtrees {
            for child in ids {
                let child_copy = self.deep_copy(child)?;
                self.attach(copy_id, kind, child_copy)?;
            }
        }
        Ok(copy_id)
    }

    /// Find an entity by alias among the children of `root`.
    ///
    /// The root's own collections are searched directly, revealed or
    /// not. Below the root, direct matches are tried before recursing,
    /// and unrevealed collections are skipped entirely at every depth.
    pub fn find_by_alias(&self, root: EntityId, alias: &str) -> EngineResult<Option<EntityId>> {
        let entity = self.get(root)?;
        for kind in entity.components.child_bearing_kinds() {
            if let Some(children) = entity.components.children(kind)
                && let Some(found) = children.by_alias(alias)
            {
                return Ok(Some(found));
            }
        }
        for kind in entity.components.child_bearing_kinds() {
            let Some(children) = entity.components.children(kind) else {
                continue;
            };
            if !children.revealed {
                continue;
            }
            for child in children.ids() {
                if let Some(found) = self.find_revealed(child, alias)? {
                    return Ok(Some(found));
                }
            }
        }
        Ok(None)
    }

    fn find_revealed(&self, id: EntityId, alias: &str) -> EngineResult<Option<EntityId>> {
        let entity = self.get(id)?;
        for kind in entity.components.child_bearing_kinds() {
            if let Some(children) = entity.components.children(kind)
                && children.revealed
                && let Some(found) = children.by_alias(alias)
            {
                return Ok(Some(found));
            }
        }
        for kind in entity.components.child_bearing_kinds() {
            let Some(children) = entity.components.children(kind) else {
                continue;
            };
            if !children.revealed {
                continue;
            }
            for child in children.ids() {
                if let Some(found) = self.find_revealed(child, alias)? {
                    return Ok(Some(found));
                }
            }
        }
        Ok(None)
    }

    /// Render an entity's description together with its revealed,
    /// non-empty child collections, one indent level per depth.
    pub fn describe(&self, id: EntityId) -> EngineResult<String> {
        self.describe_at(id, 0)
    }

    fn describe_at(&self, id: EntityId, depth: usize) -> EngineResult<String> {
        let entity = self.get(id)?;
        let pad = "  ".repeat(depth);
        let mut out = format!("{pad}- {}", entity.description);

        for kind in entity.components.child_bearing_kinds() {
            let Some(children) = entity.components.children(kind) else {
                continue;
            };
            if !children.revealed || children.is_empty() {
                continue;
            }
            out.push_str(&format!("\n{pad}  {} (", children.prefix));
            for child in children.ids() {
                out.push('\n');
                out.push_str(&self.describe_at(child, depth + 2)?);
            }
            out.push_str(&format!("\n{pad}  )"));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Container, Room};

    fn room_entity(name: &str) -> Entity {
        let mut e = Entity::new(name, format!("A {name}."));
        e.components.room = Some(Room::new());
        e
    }

    fn item(name: &str, alias: &str) -> Entity {
        Entity::new(name, format!("A {name}.")).with_alias(alias)
    }

    #[test]
    fn attach_indexes_aliases_and_links_parent() {
        let mut world = World::new();
        let cellar = world.insert(room_entity("cellar"));
        let key = world.insert(item("brass key", "key"));

        world.attach(cellar, ComponentKind::Room, key).unwrap();

        let room = world.get(cellar).unwrap().components.room.as_ref().unwrap();
        assert_eq!(room.children.by_alias("key"), Some(key));
        let link = world.get(key).unwrap().parent.unwrap();
        assert_eq!(link.entity, cellar);
        assert_eq!(link.component, ComponentKind::Room);
    }

    #[test]
    fn attach_moves_between_parents() {
        let mut world = World::new();
        let cellar = world.insert(room_entity("cellar"));
        let attic = world.insert(room_entity("attic"));
        let key = world.insert(item("brass key", "key"));

        world.attach(cellar, ComponentKind::Room, key).unwrap();
        world.attach(attic, ComponentKind::Room, key).unwrap();

        let old = world.get(cellar).unwrap().components.room.as_ref().unwrap();
        assert!(old.children.is_empty());
        let link = world.get(key).unwrap().parent.unwrap();
        assert_eq!(link.entity, attic);
    }

    #[test]
    fn attach_refuses_containment_cycles() {
        let mut world = World::new();
        let mut outer = Entity::new("outer box", "A box.").with_alias("outer");
        outer.components.container = Some(Container::new());
        let outer = world.insert(outer);
        let mut inner = Entity::new("inner box", "A box.").with_alias("inner");
        inner.components.container = Some(Container::new());
        let inner = world.insert(inner);
        world
            .attach(outer, ComponentKind::Container, inner)
            .unwrap();

        // Neither into itself nor under its own descendant.
        assert!(matches!(
            world.attach(outer, ComponentKind::Container, outer),
            Err(EngineError::ContainmentCycle { .. })
        ));
        assert!(matches!(
            world.attach(inner, ComponentKind::Container, outer),
            Err(EngineError::ContainmentCycle { .. })
        ));
        // The refused attach left the original containment untouched.
        let link = world.get(inner).unwrap().parent.unwrap();
        assert_eq!(link.entity, outer);
    }

    #[test]
    fn attach_to_missing_component_errors() {
        let mut world = World::new();
        let ghost = world.insert(Entity::new("ghost", "Translucent."));
        let key = world.insert(item("brass key", "key"));
        assert!(world.attach(ghost, ComponentKind::Container, key).is_err());
    }

    #[test]
    fn detach_without_parent_is_a_noop() {
        let mut world = World::new();
        let key = world.insert(item("brass key", "key"));
        world.detach(key).unwrap();
        assert!(world.get(key).unwrap().parent.is_none());
    }

    #[test]
    fn deep_copy_clones_the_subtree_with_fresh_ids() {
        use std::sync::Arc;

        use crate::component::Eventful;
        use crate::rule::Rule;

        let mut world = World::new();
        let mut chest = Entity::new("chest", "An oak chest.").with_alias("chest");
        chest.components.container = Some(Container::new());
        let mut eventful = Eventful::new();
        eventful.add_rule("open", Arc::new(Rule::default()));
        chest.components.eventful = Some(eventful);
        let chest = world.insert(chest);
        let key = world.insert(item("brass key", "key"));
        world.attach(chest, ComponentKind::Container, key).unwrap();

        let copy = world.deep_copy(chest).unwrap();
        assert_ne!(copy, chest);
        assert!(world.get(copy).unwrap().parent.is_none());

        let copied_key = world
            .get(copy)
            .unwrap()
            .components
            .children(ComponentKind::Container)
            .unwrap()
            .by_alias("key")
            .unwrap();
        assert_ne!(copied_key, key);

        // Mutating the copy leaves the original untouched.
        world.get_mut(copied_key).unwrap().name = "bent key".into();
        assert_eq!(world.get(key).unwrap().name, "brass key");

        // Rules stay shared; field maps do not.
        let original_rule = &world.get(chest).unwrap().components.eventful.as_ref().unwrap()
            .rules_for("open")[0];
        let copied_rule = &world.get(copy).unwrap().components.eventful.as_ref().unwrap()
            .rules_for("open")[0];
        assert!(Arc::ptr_eq(original_rule, copied_rule));
    }

    #[test]
    fn find_by_alias_prefers_direct_children() {
        let mut world = World::new();
        let cellar = world.insert(room_entity("cellar"));
        let mut chest = Entity::new("chest", "An oak chest.").with_alias("chest");
        chest.components.container = Some(Container::new());
        let chest = world.insert(chest);
        let inner = world.insert(item("brass key", "key"));
        let outer = world.insert(item("iron key", "key"));

        world.attach(cellar, ComponentKind::Room, chest).unwrap();
        world.attach(chest, ComponentKind::Container, inner).unwrap();
        world.attach(cellar, ComponentKind::Room, outer).unwrap();

        assert_eq!(world.find_by_alias(cellar, "key").unwrap(), Some(outer));
    }

    #[test]
    fn find_by_alias_skips_unrevealed_collections() {
        let mut world = World::new();
        let cellar = world.insert(room_entity("cellar"));
        let mut chest = Entity::new("chest", "An oak chest.").with_alias("chest");
        let mut container = Container::new();
        container.children.revealed = false;
        chest.components.container = Some(container);
        let chest = world.insert(chest);
        let key = world.insert(item("brass key", "key"));

        world.attach(cellar, ComponentKind::Room, chest).unwrap();
        world.attach(chest, ComponentKind::Container, key).unwrap();

        assert_eq!(world.find_by_alias(cellar, "key").unwrap(), None);

        world
            .get_mut(chest)
            .unwrap()
            .components
            .children_mut(ComponentKind::Container)
            .unwrap()
            .revealed = true;
        assert_eq!(world.find_by_alias(cellar, "key").unwrap(), Some(key));
    }

    #[test]
    fn find_by_alias_gates_reveal_at_every_depth() {
        let mut world = World::new();
        let cellar = world.insert(room_entity("cellar"));
        let mut shelf = Entity::new("shelf", "A low shelf.").with_alias("shelf");
        shelf.components.container = Some(Container::new());
        let shelf = world.insert(shelf);
        let mut chest = Entity::new("chest", "An oak chest.").with_alias("chest");
        let mut container = Container::new();
        container.children.revealed = false;
        chest.components.container = Some(container);
        let chest = world.insert(chest);
        let key = world.insert(item("brass key", "key"));

        world.attach(cellar, ComponentKind::Room, shelf).unwrap();
        world.attach(shelf, ComponentKind::Container, chest).unwrap();
        world.attach(chest, ComponentKind::Container, key).unwrap();

        // Two revealed levels down, the closed chest still hides the key
        // from every ancestor.
        assert_eq!(world.find_by_alias(cellar, "key").unwrap(), None);
        assert_eq!(world.find_by_alias(shelf, "key").unwrap(), None);
        // Searching the chest itself looks at its own contents directly.
        assert_eq!(world.find_by_alias(chest, "key").unwrap(), Some(key));
    }

    #[test]
    fn worlds_round_trip_through_json_without_rules() {
        use std::sync::Arc;

        use crate::component::Eventful;
        use crate::rule::Rule;

        let mut world = World::new();
        let mut chest = Entity::new("chest", "An oak chest.").with_alias("chest");
        chest.components.container = Some(Container::new());
        let mut eventful = Eventful::new();
        eventful.add_rule("open", Arc::new(Rule::default()));
        chest.components.eventful = Some(eventful);
        let chest = world.insert(chest);
        let key = world.insert(item("brass key", "key"));
        world.attach(chest, ComponentKind::Container, key).unwrap();

        let json = serde_json::to_string(&world).unwrap();
        let restored: World = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.len(), 2);
        let loaded = restored.get(chest).unwrap();
        assert_eq!(
            loaded
                .components
                .children(ComponentKind::Container)
                .unwrap()
                .by_alias("key"),
            Some(key)
        );
        // Rules are compiled state, never persisted.
        assert!(loaded.components.eventful.is_none());
    }

    #[test]
    fn describe_hides_unrevealed_children() {
        let mut world = World::new();
        let mut chest = Entity::new("chest", "An oak chest.");
        let mut container = Container::new();
        container.children.revealed = false;
        chest.components.container = Some(container);
        let chest = world.insert(chest);
        let key = world.insert(item("brass key", "key"));
        world.attach(chest, ComponentKind::Container, key).unwrap();

        let closed = world.describe(chest).unwrap();
        assert!(!closed.contains("brass key"));

        world
            .get_mut(chest)
            .unwrap()
            .components
            .children_mut(ComponentKind::Container)
            .unwrap()
            .revealed = true;
        let open = world.describe(chest).unwrap();
        assert!(open.contains("Inside ("));
        assert!(open.contains("A brass key."));
    }
}
