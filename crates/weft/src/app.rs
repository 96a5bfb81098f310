//! Render loop: a view function re-rendered whenever what it read changes.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;

use tracing::{debug, error, warn};
use weft_reactive::{Effect, EffectOptions, Runtime};
use weft_render::{Host, NodeId, PatchStats, RenderError, Renderer, VNode};

/// A view mounted into a container.
pub struct Mounted<H> {
    renderer: Rc<RefCell<Renderer<H>>>,
    effect: Effect,
    container: NodeId,
    last_error: Rc<RefCell<Option<RenderError>>>,
}

/// Render `view` into `container` now, and again after every flush in which
/// state it read has changed.
///
/// Re-renders are deferred through the runtime job queue, so writes made by
/// event handlers (or several writes in a row) produce one render per
/// [`Runtime::flush`] or outermost [`Runtime::batch`].
pub fn mount<H: Host + 'static>(
    rt: &Runtime,
    renderer: Renderer<H>,
    container: NodeId,
    view: impl Fn() -> VNode + 'static,
) -> Mounted<H> {
    let renderer = Rc::new(RefCell::new(renderer));
    let last_error = Rc::new(RefCell::new(None));
    let (target, errors) = (Rc::clone(&renderer), Rc::clone(&last_error));

    let effect = rt.effect_with(
        move || {
            let tree = view();
            let Ok(mut renderer) = target.try_borrow_mut() else {
                warn!(%container, "renderer is borrowed; render skipped");
                return;
            };
            match renderer.render(Some(tree), container) {
                Ok(stats) => {
                    debug!(
                        %container,
                        created = stats.created,
                        moved = stats.moved,
                        removed = stats.removed,
                        "rendered"
                    );
                    errors.borrow_mut().take();
                }
                Err(err) => {
                    error!(%container, error = %err, "render failed");
                    *errors.borrow_mut() = Some(err);
                }
            }
        },
        EffectOptions::default().scheduler(rt.deferred_scheduler()),
    );

    Mounted {
        renderer,
        effect,
        container,
        last_error,
    }
}

impl<H: Host> Mounted<H> {
    #[must_use]
    pub fn container(&self) -> NodeId {
        self.container
    }

    /// Borrow the renderer. Hold the borrow only briefly: a render that
    /// finds it borrowed is skipped.
    #[must_use]
    pub fn renderer(&self) -> Ref<'_, Renderer<H>> {
        self.renderer.borrow()
    }

    pub fn with_host<R>(&self, f: impl FnOnce(&H) -> R) -> R {
        f(self.renderer.borrow().host())
    }

    /// The error of the most recent render, if it failed.
    #[must_use]
    pub fn last_error(&self) -> Option<RenderError> {
        self.last_error.borrow().clone()
    }

    #[must_use]
    pub fn render_count(&self) -> u64 {
        self.effect.run_count()
    }

    #[must_use]
    pub fn effect(&self) -> &Effect {
        &self.effect
    }

    /// Stop re-rendering and remove the rendered tree.
    ///
    /// # Errors
    ///
    /// Propagates the reconciler error.
    pub fn unmount(self) -> Result<PatchStats, RenderError> {
        self.effect.stop();
        self.renderer.borrow_mut().render(None, self.container)
    }
}

impl<H> fmt::Debug for Mounted<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mounted")
            .field("container", &self.container)
            .field("effect", &self.effect)
            .finish_non_exhaustive()
    }
}
