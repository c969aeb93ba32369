//! Operations that load the remote application into the iframe.

use foundation::{EmbeddingTargetId, Geometry, GeometryType, ValidationError};
use futures::FutureExt;
use protocol::{
    Action, CommandType, DataType, Params, RequestType, Source, TargetInstruction, TargetType,
    ZoomInputs, resolve,
};
use runtime::{AbortSignal, Error, Platform};
use serde_json::{Value, json};

use crate::client::{Client, Pending};
use crate::options::{
    CreateGeometryOptions, EditGeometryOptions, SelectObjectsOptions, ShowMapOptions, ShowOptions,
};

/// Messages sent once the embedded application is ready.
#[derive(Default)]
struct AfterReady {
    geometry: Option<Geometry>,
    layers: Vec<Value>,
    zoom: Option<TargetInstruction>,
}

impl<P: Platform> Client<P> {
    fn trace_options(&self, method: &str, target: &str, options: &impl serde::Serialize) {
        self.trace_call(
            method,
            &[json!(target), serde_json::to_value(options).unwrap_or(Value::Null)],
        );
    }

    /// Navigates the iframe to `source` and waits for ready.
    fn embed(
        &self,
        source: &Source,
        mut params: Params,
        signal: Option<AbortSignal>,
    ) -> Result<Pending<()>, ValidationError> {
        params.web_application = self.inner.web_application.clone();
        let url = self.url(&source.path(), &params)?;
        self.inner.trace.note(&format!("Load iframe {url}"));
        let navigation = self.inner.session.navigate(url, signal)?;
        let trace = self.inner.trace;
        Ok(async move {
            let outcome = navigation.await;
            match &outcome {
                Ok(()) => trace.note("Iframe loaded"),
                Err(e) => trace.note(&format!("Iframe loading failed: {e}")),
            }
            outcome
        }
        .boxed_local())
    }

    fn embed_then(
        &self,
        source: &Source,
        params: Params,
        signal: Option<AbortSignal>,
        after: AfterReady,
    ) -> Result<Pending<()>, ValidationError> {
        let navigation = self.embed(source, params, signal)?;
        let client = self.clone();
        Ok(async move {
            navigation.await?;
            if let Some(geometry) = after.geometry {
                client.command(CommandType::SetGeometry, json!({ "geometry": geometry }))?;
            }
            for layer in after.layers {
                client.request(RequestType::ImportLayer, layer)?.await?;
            }
            if let Some(zoom) = after.zoom.filter(TargetInstruction::needs_message) {
                let detail = serde_json::to_value(&zoom).unwrap_or(Value::Null);
                client.command(CommandType::SetZoomTarget, detail)?;
            }
            Ok(())
        }
        .boxed_local())
    }

    /// Shows an embedding target or a well-known page.
    pub fn show(&self, source: Source, options: ShowOptions) -> Result<Pending<()>, ValidationError> {
        self.trace_options("show", &source.path(), &options);
        if let Some(data_type) = options.data_type {
            data_type.ensure_one_of(&[DataType::Pdf])?;
        }
        if options.label_set.is_some() && !source.is_welcome_page() {
            return Err(ValidationError::Unsupported(
                "labelSet is only supported on the welcome page",
            ));
        }
        let params = Params {
            data_type: options.data_type,
            disabled_ui_features: options.disabled_ui_features,
            expand_navigator: options.expand_navigator,
            filter: options.filter,
            hide_main_header_and_footer: options.hide_main_header_and_footer,
            hide_workbook_tool_bar: options.hide_workbook_tool_bar,
            highlight_global_id: options.highlight_global_id,
            label_set: options.label_set,
            layout: options.layout,
            operation_mode: options.operation_mode,
            ..Params::default()
        };
        self.embed(&source, params, options.signal)
    }

    /// Shows a map view, optionally with a geometry, zoomed to the resolved target.
    pub fn show_map(
        &self,
        map_view: EmbeddingTargetId,
        options: ShowMapOptions,
    ) -> Result<Pending<()>, ValidationError> {
        self.trace_options("showMap", map_view.as_str(), &options);
        let zoom = resolve(&ZoomInputs {
            zoom_target: options.zoom_target.as_ref(),
            geometry: options.geometry.as_ref(),
            map_extent: options.map_extent,
            location_finder: options.location_finder.as_deref(),
        });
        let mut params = Params {
            disabled_ui_features: options.disabled_ui_features,
            expand_navigator: options.expand_navigator,
            filter: options.filter,
            hide_main_header_and_footer: options.hide_main_header_and_footer,
            hide_workbook_tool_bar: options.hide_workbook_tool_bar,
            highlight_global_id: options.highlight_global_id,
            layout: options.layout,
            location_finder: options.location_finder,
            map_extent: options.map_extent,
            operation_mode: options.operation_mode,
            target_type: Some(TargetType::Map),
            use_map_srs: options.use_map_srs,
            ..Params::default()
        };
        if let Some(zoom) = &zoom {
            zoom.apply_to(&mut params);
        }
        let after = AfterReady {
            geometry: options.geometry,
            layers: Vec::new(),
            zoom,
        };
        self.embed_then(&Source::EmbeddingTarget(map_view), params, options.signal, after)
    }

    /// Lets the user draw a new geometry of the given type.
    pub fn create_geometry(
        &self,
        map_view: EmbeddingTargetId,
        geometry_type: GeometryType,
        options: CreateGeometryOptions,
    ) -> Result<Pending<()>, ValidationError> {
        self.trace_options("createGeometry", map_view.as_str(), &options);
        self.geometry_editor(map_view, Some(geometry_type), None, options)
    }

    /// Lets the user edit `geometry`.
    pub fn edit_geometry(
        &self,
        map_view: EmbeddingTargetId,
        geometry: Geometry,
        options: EditGeometryOptions,
    ) -> Result<Pending<()>, ValidationError> {
        self.trace_options("editGeometry", map_view.as_str(), &options);
        self.geometry_editor(map_view, None, Some(geometry), options)
    }

    fn geometry_editor(
        &self,
        map_view: EmbeddingTargetId,
        geometry_type: Option<GeometryType>,
        geometry: Option<Geometry>,
        options: CreateGeometryOptions,
    ) -> Result<Pending<()>, ValidationError> {
        let zoom = resolve(&ZoomInputs {
            zoom_target: options.zoom_target.as_ref(),
            geometry: geometry.as_ref(),
            map_extent: options.map_extent,
            location_finder: options.location_finder.as_deref(),
        });
        let mut params = Params {
            action: Some(Action::EditGeometry),
            disabled_ui_features: options.disabled_ui_features,
            filter: options.filter,
            geometry_type,
            location_finder: options.location_finder,
            map_extent: options.map_extent,
            min_scale: options.min_scale,
            operation_mode: options.operation_mode,
            snapping_layer: options.snapping_layer,
            snapping_types: options.snapping_types,
            use_map_srs: options.use_map_srs,
            ..Params::default()
        };
        if let Some(zoom) = &zoom {
            zoom.apply_to(&mut params);
        }
        let after = AfterReady {
            geometry,
            layers: options.additional_layers,
            zoom,
        };
        self.embed_then(&Source::EmbeddingTarget(map_view), params, options.signal, after)
    }

    /// Lets the user select objects on the given layers.
    pub fn select_objects(
        &self,
        map_view: EmbeddingTargetId,
        options: SelectObjectsOptions,
    ) -> Result<Pending<()>, ValidationError> {
        self.trace_options("selectObjects", map_view.as_str(), &options);
        let params = Params {
            action: Some(Action::SelectObjects),
            filter: options.filter,
            layers: options.layers,
            location_finder: options.location_finder,
            map_extent: options.map_extent,
            operation_mode: options.operation_mode,
            use_map_srs: options.use_map_srs,
            ..Params::default()
        };
        self.embed(&Source::EmbeddingTarget(map_view), params, options.signal)
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use foundation::{Extent, ExternalLinkKey, GlobalId, LayerPath, PageName};
    use futures::executor::LocalPool;
    use futures::task::LocalSpawnExt;
    use pretty_assertions::assert_eq;
    use protocol::{Event, FilterVariables, ZoomTarget};
    use runtime::fake::FakePlatform;
    use runtime::{AbortController, ErrorType, RemoteError};
    use std::cell::RefCell;

    use super::*;
    use crate::client::testing::*;
    use crate::fetch::testing::FakeHttp;
    use crate::options::ClientOptions;

    type Outcome = Rc<RefCell<Option<Result<(), Error>>>>;

    fn spawn(pool: &LocalPool, fut: Pending<()>) -> Outcome {
        let outcome: Outcome = Rc::new(RefCell::new(None));
        let o = outcome.clone();
        pool.spawner()
            .spawn_local(async move {
                *o.borrow_mut() = Some(fut.await);
            })
            .unwrap();
        outcome
    }

    fn view(id: &str) -> EmbeddingTargetId {
        EmbeddingTargetId::new(id).unwrap()
    }

    fn ready(h: &Harness) {
        h.platform
            .dispatch(ORIGIN, Some(h.frame.window()), Event::bare("ready"));
    }

    #[test]
    fn welcome_page_resolves_on_ready() {
        let h = harness();
        let mut pool = LocalPool::new();
        let outcome = spawn(
            &pool,
            h.client
                .show(Source::Page(PageName::Welcome), ShowOptions::default())
                .unwrap(),
        );
        pool.run_until_stalled();
        assert_eq!(
            h.frame.sources(),
            vec!["https://example.test/app/public/pages/welcome".to_string()]
        );
        assert_eq!(*outcome.borrow(), None);

        ready(&h);
        pool.run_until_stalled();
        assert_eq!(*outcome.borrow(), Some(Ok(())));
    }

    #[test]
    fn welcome_page_rejects_on_unauthorized() {
        let h = harness();
        let mut pool = LocalPool::new();
        let outcome = spawn(
            &pool,
            h.client
                .show(Source::Page(PageName::Welcome), ShowOptions::default())
                .unwrap(),
        );
        pool.run_until_stalled();
        h.platform.dispatch(
            ORIGIN,
            Some(h.frame.window()),
            Event::new("error", serde_json::json!({"type": "unauthorized"})),
        );
        pool.run_until_stalled();
        assert_eq!(
            *outcome.borrow(),
            Some(Err(Error::Remote(RemoteError::new(
                ErrorType::Unauthorized,
                "Loading failed"
            ))))
        );
    }

    #[test]
    fn show_encodes_options() {
        let h = harness();
        let navigation = h
            .client
            .show(
                Source::EmbeddingTarget(view("embedding-target")),
                ShowOptions {
                    expand_navigator: true,
                    hide_main_header_and_footer: true,
                    hide_workbook_tool_bar: true,
                    highlight_global_id: Some(GlobalId("ROOT.MyFolder".to_string())),
                    ..Default::default()
                },
            )
            .unwrap();
        let mut pool = LocalPool::new();
        let _ = spawn(&pool, navigation);
        pool.run_until_stalled();
        assert_eq!(
            h.frame.sources(),
            vec![
                "https://example.test/app/w/embedding-target?expandNavigator=true&hideMainHeaderAndFooter=true&hideWorkbookToolBar=true&highlightGlobalId=ROOT.MyFolder"
                    .to_string()
            ]
        );
    }

    #[test]
    fn show_rejects_invalid_arguments_before_navigating() {
        let h = harness();
        let bad_filter = h.client.show(
            Source::EmbeddingTarget(view("view")),
            ShowOptions {
                filter: Some(FilterVariables::new().with("notKebab", "x")),
                ..Default::default()
            },
        );
        assert!(matches!(
            bad_filter.err(),
            Some(ValidationError::InvalidFilterVariableName(_))
        ));

        let bad_type = h.client.show(
            Source::EmbeddingTarget(view("view")),
            ShowOptions {
                data_type: Some(DataType::Csv),
                ..Default::default()
            },
        );
        assert_eq!(
            bad_type.err(),
            Some(ValidationError::InvalidDataType("csv".to_string()))
        );

        let label_set = h.client.show(
            Source::EmbeddingTarget(view("view")),
            ShowOptions {
                label_set: Some("labels".to_string()),
                ..Default::default()
            },
        );
        assert!(matches!(label_set.err(), Some(ValidationError::Unsupported(_))));
        assert!(h.frame.sources().is_empty());
    }

    #[test]
    fn invisible_iframe_is_rejected() {
        let h = harness();
        h.frame.resize(0.0, 0.0);
        let result = h
            .client
            .show(Source::EmbeddingTarget(view("view")), ShowOptions::default());
        assert_eq!(result.err(), Some(ValidationError::IframeNotVisible));
        assert!(h.frame.sources().is_empty());
    }

    #[test]
    fn parent_client_cannot_embed() {
        let (_, client) = parent_harness();
        let result = client.show(Source::EmbeddingTarget(view("view")), ShowOptions::default());
        assert_eq!(result.err(), Some(ValidationError::BaseUrlMissing));
    }

    #[test]
    fn abort_rejects_and_stops_iframe() {
        let h = harness();
        let controller = AbortController::new();
        let mut pool = LocalPool::new();
        let outcome = spawn(
            &pool,
            h.client
                .show(
                    Source::EmbeddingTarget(view("view")),
                    ShowOptions {
                        signal: Some(controller.signal()),
                        ..Default::default()
                    },
                )
                .unwrap(),
        );
        pool.run_until_stalled();
        controller.abort();
        pool.run_until_stalled();
        assert_eq!(*outcome.borrow(), Some(Err(Error::Aborted)));
        assert_eq!(h.frame.stop_count(), 1);
    }

    #[test]
    fn web_application_is_added_to_navigation() {
        let platform = Rc::new(FakePlatform::new());
        let http = Rc::new(FakeHttp::default());
        let frame = platform.new_frame((100.0, 100.0));
        let client = Client::with_iframe(
            env(&platform, &http),
            frame.clone(),
            ClientOptions {
                base_url: Some(BASE.to_string()),
                web_application: Some(ExternalLinkKey::new("my-repo", "abcd").unwrap()),
                ..Default::default()
            },
        )
        .unwrap();
        let mut pool = LocalPool::new();
        let _ = spawn(
            &pool,
            client
                .show(Source::EmbeddingTarget(view("view")), ShowOptions::default())
                .unwrap(),
        );
        pool.run_until_stalled();
        assert_eq!(
            frame.sources(),
            vec!["https://example.test/app/w/view?webApplicationLink=abcd&webApplicationLinkRepository=my-repo".to_string()]
        );
    }

    #[test]
    fn show_map_posts_geometry_and_zoom_target_after_ready() {
        let h = harness();
        let mut pool = LocalPool::new();
        let geometry = Geometry::point(1.0, 2.0);
        let outcome = spawn(
            &pool,
            h.client
                .show_map(
                    view("map"),
                    ShowMapOptions {
                        geometry: Some(geometry.clone()),
                        map_extent: Some(Extent::new(0.0, 0.0, 1.0, 1.0)),
                        use_map_srs: true,
                        ..Default::default()
                    },
                )
                .unwrap(),
        );
        pool.run_until_stalled();
        assert_eq!(
            h.frame.sources(),
            vec!["https://example.test/app/w/map?mapExtent=0%2C0%2C1%2C1&targetType=MAP&useMapSrs=true".to_string()]
        );
        assert!(h.platform.posted().is_empty());

        ready(&h);
        pool.run_until_stalled();
        assert_eq!(*outcome.borrow(), Some(Ok(())));
        assert_eq!(h.platform.posted_types(), vec!["setGeometry", "setZoomTarget"]);
        let zoom = h.platform.last_posted().unwrap().event;
        assert_eq!(zoom.detail["type"], "geometry");
        assert_eq!(zoom.detail["geometry"], serde_json::to_value(&geometry).unwrap());
    }

    #[test]
    fn show_map_extent_target_clears_location_finder() {
        let h = harness();
        let mut pool = LocalPool::new();
        let outcome = spawn(
            &pool,
            h.client
                .show_map(
                    view("map"),
                    ShowMapOptions {
                        location_finder: Some("Berlin".to_string()),
                        zoom_target: Some(ZoomTarget::MapExtent {
                            extent: Some(Extent::new(1.0, 2.0, 3.0, 4.0)),
                        }),
                        ..Default::default()
                    },
                )
                .unwrap(),
        );
        pool.run_until_stalled();
        assert_eq!(
            h.frame.sources(),
            vec!["https://example.test/app/w/map?mapExtent=1%2C2%2C3%2C4&targetType=MAP".to_string()]
        );
        ready(&h);
        pool.run_until_stalled();
        assert_eq!(*outcome.borrow(), Some(Ok(())));
        assert!(h.platform.posted().is_empty());
    }

    #[test]
    fn create_geometry_imports_layers_in_order() {
        let h = harness();
        let mut pool = LocalPool::new();
        let outcome = spawn(
            &pool,
            h.client
                .create_geometry(
                    view("map"),
                    GeometryType::Polygon,
                    CreateGeometryOptions {
                        additional_layers: vec![
                            serde_json::json!({"name": "a"}),
                            serde_json::json!({"name": "b"}),
                        ],
                        min_scale: Some(5000.0),
                        zoom_target: Some(ZoomTarget::DataExtent),
                        ..Default::default()
                    },
                )
                .unwrap(),
        );
        pool.run_until_stalled();
        assert_eq!(
            h.frame.sources(),
            vec!["https://example.test/app/w/map?action=editGeometry&geometryType=Polygon&minScale=5000".to_string()]
        );

        ready(&h);
        pool.run_until_stalled();
        assert_eq!(h.platform.posted_types(), vec!["importLayer"]);
        h.platform
            .last_posted()
            .unwrap()
            .port
            .unwrap()
            .reply(Event::bare("importLayer:success"));
        pool.run_until_stalled();
        assert_eq!(h.platform.posted_types(), vec!["importLayer", "importLayer"]);
        h.platform
            .last_posted()
            .unwrap()
            .port
            .unwrap()
            .reply(Event::bare("importLayer:success"));
        pool.run_until_stalled();
        assert_eq!(
            h.platform.posted_types(),
            vec!["importLayer", "importLayer", "setZoomTarget"]
        );
        assert_eq!(*outcome.borrow(), Some(Ok(())));
    }

    #[test]
    fn edit_geometry_sends_geometry() {
        let h = harness();
        let mut pool = LocalPool::new();
        let geometry = Geometry::polygon(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]);
        let outcome = spawn(
            &pool,
            h.client
                .edit_geometry(view("map"), geometry.clone(), EditGeometryOptions::default())
                .unwrap(),
        );
        pool.run_until_stalled();
        assert_eq!(
            h.frame.sources(),
            vec!["https://example.test/app/w/map?action=editGeometry".to_string()]
        );
        ready(&h);
        pool.run_until_stalled();
        assert_eq!(*outcome.borrow(), Some(Ok(())));
        let posted = h.platform.posted();
        assert_eq!(posted[0].event.kind, "setGeometry");
        assert_eq!(
            posted[0].event.detail,
            serde_json::json!({"geometry": serde_json::to_value(&geometry).unwrap()})
        );
        // The edited geometry is also the zoom target.
        assert_eq!(posted[1].event.kind, "setZoomTarget");
    }

    #[test]
    fn select_objects_encodes_layers() {
        let h = harness();
        let mut pool = LocalPool::new();
        let _ = spawn(
            &pool,
            h.client
                .select_objects(
                    view("map"),
                    SelectObjectsOptions {
                        layers: vec![LayerPath::from("Rivers"), LayerPath::from(["Water", "Lakes"])],
                        ..Default::default()
                    },
                )
                .unwrap(),
        );
        pool.run_until_stalled();
        let url = url::Url::parse(&h.frame.sources()[0]).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("action".to_string(), "selectObjects".to_string()),
                ("layers".to_string(), r#"[["Rivers"],["Water","Lakes"]]"#.to_string()),
            ]
        );
    }
}
