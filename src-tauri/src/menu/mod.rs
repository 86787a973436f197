//! Overlay menu bookkeeping.
//!
//! [`MenuWindowManager`] is the only owner of open menus. At most one menu is
//! open at a time and each overlay window is destroyed exactly once: the
//! window handle is consumed by [`OverlayWindow::destroy`] and the entity is
//! removed from the map before that happens.

pub mod geometry;
pub mod overlay;

use std::collections::HashMap;

use log::{debug, warn};
use uuid::Uuid;

use crate::error::MonitorError;
use geometry::{clamp_to_work_area, MenuLayout, Point, Size, WorkArea};

/// Everything a backend needs to open one overlay.
pub struct OverlaySpec<'a> {
    pub id: Uuid,
    pub text: &'a str,
    pub position: Point,
    pub size: Size,
}

pub trait OverlayWindow: Send {
    fn move_to(&self, position: Point) -> Result<(), MonitorError>;
    fn destroy(self: Box<Self>);
}

pub trait OverlayBackend: Send {
    fn work_area_at(&self, at: Point) -> Option<WorkArea>;

    /// Creates a frameless, always-on-top, focused overlay already placed
    /// at `spec.position`.
    fn create(&mut self, spec: &OverlaySpec<'_>) -> Result<Box<dyn OverlayWindow>, MonitorError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuPhase {
    Created,
    Shown,
    Dismissed,
    ActionTaken,
    Destroyed,
}

impl MenuPhase {
    fn can_advance_to(self, next: MenuPhase) -> bool {
        matches!(
            (self, next),
            (MenuPhase::Created, MenuPhase::Shown)
                | (MenuPhase::Created, MenuPhase::Dismissed)
                | (MenuPhase::Shown, MenuPhase::Dismissed)
                | (MenuPhase::Shown, MenuPhase::ActionTaken)
                | (MenuPhase::Dismissed, MenuPhase::Destroyed)
                | (MenuPhase::ActionTaken, MenuPhase::Destroyed)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeardownReason {
    ActionTaken,
    Dismissed,
    FocusLost,
    SelectionCleared,
    Replaced,
    Shutdown,
}

impl TeardownReason {
    fn phase(self) -> MenuPhase {
        match self {
            TeardownReason::ActionTaken => MenuPhase::ActionTaken,
            TeardownReason::Dismissed
            | TeardownReason::FocusLost
            | TeardownReason::SelectionCleared
            | TeardownReason::Replaced
            | TeardownReason::Shutdown => MenuPhase::Dismissed,
        }
    }
}

pub struct MenuEntity {
    pub id: Uuid,
    pub owner_selection_text: String,
    pub screen_position: Point,
    size: Size,
    work_area: Option<WorkArea>,
    phase: MenuPhase,
    window: Option<Box<dyn OverlayWindow>>,
}

impl MenuEntity {
    #[cfg(test)]
    pub fn phase(&self) -> MenuPhase {
        self.phase
    }

    fn advance(&mut self, next: MenuPhase) {
        if self.phase.can_advance_to(next) {
            self.phase = next;
        } else {
            warn!("menu {}: ignoring transition {:?} -> {:?}", self.id, self.phase, next);
        }
    }

    fn destroy(mut self, reason: TeardownReason) {
        self.advance(reason.phase());
        if let Some(window) = self.window.take() {
            window.destroy();
        }
        self.advance(MenuPhase::Destroyed);
        debug!("menu {} destroyed ({reason:?})", self.id);
    }
}

pub struct MenuWindowManager {
    backend: Box<dyn OverlayBackend>,
    layout: MenuLayout,
    menus: HashMap<Uuid, MenuEntity>,
}

impl MenuWindowManager {
    pub fn new(backend: Box<dyn OverlayBackend>, layout: MenuLayout) -> Self {
        Self {
            backend,
            layout,
            menus: HashMap::new(),
        }
    }

    /// Replaces any open menu with a new one for `text`, anchored below `at`.
    pub fn show(&mut self, text: &str, at: Point) -> Result<Uuid, MonitorError> {
        self.hide_all(TeardownReason::Replaced);

        let work_area = self.backend.work_area_at(at);
        let scale = work_area.map_or(1.0, |area| area.scale_factor);
        let size = self.layout.physical_size(scale);
        let anchor = Point::new(at.x, at.y.saturating_add(self.layout.physical_offset(scale)));
        let position = work_area.map_or(anchor, |area| clamp_to_work_area(anchor, size, &area));

        let id = Uuid::new_v4();
        let mut entity = MenuEntity {
            id,
            owner_selection_text: text.to_string(),
            screen_position: position,
            size,
            work_area,
            phase: MenuPhase::Created,
            window: None,
        };

        let window = self.backend.create(&OverlaySpec {
            id,
            text,
            position,
            size,
        })?;
        entity.window = Some(window);
        entity.advance(MenuPhase::Shown);

        debug!("menu {id} shown at ({}, {})", position.x, position.y);
        self.menus.insert(id, entity);
        Ok(id)
    }

    /// Tears down one menu. Returns `false` if it was already gone.
    pub fn hide(&mut self, id: Uuid, reason: TeardownReason) -> bool {
        match self.menus.remove(&id) {
            Some(entity) => {
                entity.destroy(reason);
                true
            }
            None => false,
        }
    }

    /// Tears down every open menu; a no-op when none are open.
    pub fn hide_all(&mut self, reason: TeardownReason) -> usize {
        let ids: Vec<Uuid> = self.menus.keys().copied().collect();
        ids.into_iter().filter(|id| self.hide(*id, reason)).count()
    }

    /// Moves a menu, keeping its whole box on the display under `at`.
    pub fn reposition(&mut self, id: Uuid, at: Point) -> Option<Point> {
        let work_area = self.backend.work_area_at(at);
        let layout = self.layout;
        let entity = self.menus.get_mut(&id)?;

        if let Some(area) = work_area {
            entity.work_area = Some(area);
            entity.size = layout.physical_size(area.scale_factor);
        }
        let target = entity
            .work_area
            .map_or(at, |area| clamp_to_work_area(at, entity.size, &area));

        if target != entity.screen_position {
            if let Some(window) = &entity.window {
                if let Err(err) = window.move_to(target) {
                    warn!("menu {id}: {err}");
                }
            }
            entity.screen_position = target;
        }
        Some(target)
    }

    pub fn open_menu(&self) -> Option<&MenuEntity> {
        self.menus.values().next()
    }

    #[cfg(test)]
    pub fn get(&self, id: Uuid) -> Option<&MenuEntity> {
        self.menus.get(&id)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.menus.contains_key(&id)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.menus.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.menus.is_empty()
    }
}
