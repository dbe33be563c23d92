//! Application event loop.
//!
//! [`App`] is the winit [`ApplicationHandler`]. It creates the window and the GPU
//! renderer on `resumed`, starts the asset loads and then ticks the gallery on
//! every redraw.
//!
//! # Lifecycle
//!
//! 1. `resumed` creates the window, the [`Context`] and the [`GalleryScene`]
//! 2. the model and the environment map load on the async runtime
//! 3. finished loads arrive as [`AppEvent`]s through the event loop proxy and
//!    are applied on the event loop thread
//! 4. every `RedrawRequested` runs one tick and requests the next redraw
//!
//! Window input goes to the debug panel first; whatever it does not consume
//! drives the orbit controls.

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    config::{SceneConfig, Tuning},
    context::Context,
    data_structures::{material::update_all_materials, texture_data::TextureData},
    debug::{DebugPanel, DebugUi, PanelChange},
    gpu_renderer::GpuRenderer,
    resources::{self, LoadedModel},
    scene::GalleryScene,
    viewport::Viewport,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Messages posted to the event loop by asynchronous work.
pub enum AppEvent {
    /// The GPU context finished initialising (web only, native setup is synchronous).
    #[allow(dead_code)]
    ContextReady(anyhow::Result<Context>),
    ModelLoaded(LoadedModel),
    BackgroundLoaded(TextureData),
}

impl std::fmt::Debug for AppEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ContextReady(ctx) => f
                .debug_tuple("ContextReady")
                .field(&ctx.as_ref().map(|_| "Context"))
                .finish(),
            Self::ModelLoaded(model) => f.debug_tuple("ModelLoaded").field(&model.name).finish(),
            Self::BackgroundLoaded(texture) => f
                .debug_tuple("BackgroundLoaded")
                .field(&texture.label)
                .finish(),
        }
    }
}

/// Everything that exists once the window and the GPU are up.
pub struct AppState {
    renderer: GpuRenderer,
    gallery: GalleryScene,
    viewport: Viewport,
    panel: DebugPanel,
    ui: DebugUi,
    tuning: Tuning,
}

impl AppState {
    fn new(ctx: Context, config: &SceneConfig) -> Self {
        let size = ctx.window.inner_size();
        let window = ctx.window.clone();
        let renderer = GpuRenderer::new(ctx, config.reflection.resolution);
        let viewport = Viewport::new(&config.viewport);
        let gallery = GalleryScene::new(config, viewport.aspect());
        let mut state = Self {
            renderer,
            gallery,
            viewport,
            panel: DebugPanel::new(config.tuning),
            ui: DebugUi::new(&window),
            tuning: config.tuning,
        };
        state.resize(size);
        state
    }

    fn window(&self) -> &Window {
        &self.renderer.ctx.window
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        let scale_factor = self.window().scale_factor();
        let logical: LogicalSize<f64> = size.to_logical(scale_factor);
        self.gallery
            .controls
            .set_viewport_height(size.height as f32);
        if let Some((width, height)) = self.viewport.resize(
            &mut self.gallery.camera,
            logical.width.round() as u32,
            logical.height.round() as u32,
            scale_factor as f32,
        ) {
            self.renderer.resize(width, height);
        }
    }

    fn apply(&mut self, event: AppEvent) {
        match event {
            AppEvent::ModelLoaded(model) => {
                self.gallery.attach_model(model, &self.tuning);
            }
            AppEvent::BackgroundLoaded(texture) => self.gallery.set_background(texture),
            AppEvent::ContextReady(_) => log::warn!("Context is already initialised"),
        }
    }

    /// Runs the debug panel for this frame and hands its widgets to the renderer.
    fn update_panel(&mut self) {
        let window = self.renderer.ctx.window.clone();
        let mut change = PanelChange::default();
        let frame = self.ui.run(&window, |ctx| {
            change |= self.panel.show(ctx, &mut self.tuning);
        });
        if change.needs_material_update {
            update_all_materials(&mut self.gallery.scene.graph, &self.tuning);
        }
        self.renderer.set_overlay(frame);
    }

    fn redraw(&mut self) {
        self.update_panel();
        if let Err(e) = self.gallery.tick(&mut self.renderer, &self.tuning) {
            log::error!("Frame failed: {e:#}");
        }
        self.window().request_redraw();
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<AppEvent>,
    config: SceneConfig,
    state: Option<AppState>,
    /// Loads that finished before the state existed.
    pending: Vec<AppEvent>,
    /// Fatal startup error, returned from [`run`].
    error: Option<anyhow::Error>,
}

impl App {
    pub fn new(event_loop: &EventLoop<AppEvent>, config: SceneConfig) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            config,
            state: None,
            pending: Vec::new(),
            error: None,
        })
    }

    fn start(&mut self, ctx: Context) {
        let mut state = AppState::new(ctx, &self.config);
        for event in self.pending.drain(..) {
            state.apply(event);
        }
        state.window().request_redraw();
        self.state = Some(state);
        self.spawn_loads();
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        self.error = Some(error);
        event_loop.exit();
    }

    fn spawn_loads(&self) {
        let assets = &self.config.assets;
        if let Some(path) = assets.model.clone() {
            let root = assets.root.clone();
            self.spawn_load(format!("model {path}"), async move {
                resources::load_model_gltf(&root, &path)
                    .await
                    .map(AppEvent::ModelLoaded)
            });
        }
        if let Some(path) = assets.environment_map.clone() {
            let root = assets.root.clone();
            self.spawn_load(format!("environment map {path}"), async move {
                resources::load_environment_map(&root, &path)
                    .await
                    .map(AppEvent::BackgroundLoaded)
            });
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn spawn_load<F>(&self, what: String, load: F)
    where
        F: Future<Output = anyhow::Result<AppEvent>> + Send + 'static,
    {
        let proxy = self.proxy.clone();
        self.async_runtime.spawn(async move {
            deliver(proxy, what, load.await);
        });
    }

    #[cfg(target_arch = "wasm32")]
    fn spawn_load<F>(&self, what: String, load: F)
    where
        F: Future<Output = anyhow::Result<AppEvent>> + 'static,
    {
        let proxy = self.proxy.clone();
        wasm_bindgen_futures::spawn_local(async move {
            deliver(proxy, what, load.await);
        });
    }
}

/// Posts a finished load; failures are logged and leave the scene without the asset.
fn deliver(proxy: EventLoopProxy<AppEvent>, what: String, result: anyhow::Result<AppEvent>) {
    match result {
        Ok(event) => {
            log::info!("Loaded {what}");
            if proxy.send_event(event).is_err() {
                log::warn!("Event loop closed before {what} could be applied");
            }
        }
        Err(e) => log::error!("Loading {what} failed: {e:#}"),
    }
}

impl ApplicationHandler<AppEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        let viewport = &self.config.viewport;
        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes()
            .with_title(viewport.title.clone())
            .with_inner_size(LogicalSize::new(viewport.width, viewport.height));

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let canvas = wgpu::web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(CANVAS_ID));
            if let Some(canvas) = canvas {
                window_attributes = window_attributes.with_canvas(Some(canvas.unchecked_into()));
            } else {
                log::warn!("No #{CANVAS_ID} element, winit creates its own canvas");
            }
        }

        let window = match event_loop.create_window(window_attributes) {
            Ok(window) => Arc::new(window),
            Err(e) => return self.fail(event_loop, e.into()),
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(Context::new(window)) {
                Ok(ctx) => self.start(ctx),
                Err(e) => self.fail(event_loop, e),
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            wasm_bindgen_futures::spawn_local(async move {
                let ctx = Context::new(window).await;
                if proxy.send_event(AppEvent::ContextReady(ctx)).is_err() {
                    log::error!("Event loop closed during initialisation");
                }
            });
        }
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: AppEvent) {
        if let Some(state) = &mut self.state {
            state.apply(event);
            return;
        }
        match event {
            AppEvent::ContextReady(Ok(ctx)) => self.start(ctx),
            AppEvent::ContextReady(Err(e)) => self.fail(event_loop, e),
            event => {
                log::debug!("{event:?} arrived before initialisation, deferring");
                self.pending.push(event);
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        let consumed = state
            .ui
            .on_window_event(&state.renderer.ctx.window, &event);
        if !consumed {
            let gallery = &mut state.gallery;
            gallery
                .controls
                .handle_window_events(&event, &gallery.camera);
        }

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size),
            WindowEvent::ScaleFactorChanged { .. } => {
                let size = state.window().inner_size();
                state.resize(size);
            }
            WindowEvent::RedrawRequested => state.redraw(),
            _ => {}
        }
    }
}

/// Opens the window and runs the gallery until it is closed.
pub fn run(config: SceneConfig) -> anyhow::Result<()> {
    #[cfg(not(target_arch = "wasm32"))]
    {
        let env = env_logger::Env::default().default_filter_or("info");
        if let Err(e) = env_logger::Builder::from_env(env).try_init() {
            eprintln!("Warning: Could not initialize logger: {}", e);
        };
    }

    #[cfg(target_arch = "wasm32")]
    {
        if let Err(e) = console_log::init_with_level(log::Level::Info) {
            web_sys::console::warn_1(&format!("Could not initialize logger: {e}").into());
        }
    }

    let event_loop: EventLoop<AppEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config)?;
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), JsValue> {
    run(SceneConfig::default()).map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
