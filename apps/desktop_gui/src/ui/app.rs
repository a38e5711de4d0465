use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

use crossbeam_channel::{Receiver, Sender};
use eframe::egui;

use client_core::{
    view::ActivityCard, Banner, BannerKind, ClientEvent, DirectoryClient, HttpActivitiesApi,
    DIRECTORY_UNAVAILABLE_MESSAGE,
};

use crate::backend_bridge::commands::BackendCommand;
use crate::config::Settings;
use crate::controller::events::{classify_load_failure, UiError, UiErrorContext, UiEvent};
use crate::controller::orchestration::dispatch_backend_command;

const SELECT_PLACEHOLDER: &str = "-- Select an activity --";

struct ActiveBanner {
    banner: Banner,
    raised_at: Instant,
}

impl ActiveBanner {
    fn new(banner: Banner) -> Self {
        Self {
            banner,
            raised_at: Instant::now(),
        }
    }

    fn is_expired(&self) -> bool {
        self.raised_at.elapsed() >= self.banner.ttl
    }

    fn remaining(&self) -> Duration {
        self.banner.ttl.saturating_sub(self.raised_at.elapsed())
    }
}

pub struct ActivityDeskApp {
    cmd_tx: Sender<BackendCommand>,
    ui_rx: Receiver<UiEvent>,

    cards: Vec<ActivityCard>,
    option_names: Vec<String>,
    directory_unavailable: bool,

    email_input: String,
    selected_activity: Option<String>,

    banner: Option<ActiveBanner>,
    status: String,
}

impl ActivityDeskApp {
    pub fn new(cmd_tx: Sender<BackendCommand>, ui_rx: Receiver<UiEvent>) -> Self {
        Self {
            cmd_tx,
            ui_rx,
            cards: Vec::new(),
            option_names: Vec::new(),
            directory_unavailable: false,
            email_input: String::new(),
            selected_activity: None,
            banner: None,
            status: "Backend worker starting...".to_string(),
        }
    }

    fn process_ui_events(&mut self) {
        while let Ok(event) = self.ui_rx.try_recv() {
            match event {
                UiEvent::BackendReady => {
                    self.status = "Loading activities...".to_string();
                    dispatch_backend_command(
                        &self.cmd_tx,
                        BackendCommand::ReloadDirectory,
                        &mut self.status,
                    );
                }
                UiEvent::DirectoryReplaced(cards) => {
                    self.option_names = cards.iter().map(|card| card.name.clone()).collect();
                    if let Some(selected) = &self.selected_activity {
                        if !self.option_names.contains(selected) {
                            self.selected_activity = None;
                        }
                    }
                    self.cards = cards;
                    self.directory_unavailable = false;
                    self.status = format!("{} activities", self.cards.len());
                }
                UiEvent::DirectoryUnavailable => {
                    // The list area shows the static failure message; the
                    // selection keeps its last good options.
                    self.cards.clear();
                    self.directory_unavailable = true;
                    self.status = "Directory reload failed".to_string();
                }
                UiEvent::BannerRaised(banner) => {
                    self.banner = Some(ActiveBanner::new(banner));
                }
                UiEvent::SignupAccepted => {
                    self.email_input.clear();
                    self.selected_activity = None;
                }
                UiEvent::Error(err) => {
                    self.status = if err.context() == UiErrorContext::BackendStartup {
                        classify_load_failure(err.message())
                    } else {
                        format!("Error: {}", err.message())
                    };
                }
            }
        }
    }

    fn expire_banner(&mut self, ctx: &egui::Context) {
        if let Some(active) = &self.banner {
            if active.is_expired() {
                self.banner = None;
            } else {
                ctx.request_repaint_after(active.remaining());
            }
        }
    }

    fn show_banner(&self, ui: &mut egui::Ui) {
        if let Some(active) = &self.banner {
            let color = match active.banner.kind {
                BannerKind::Success => egui::Color32::from_rgb(67, 150, 67),
                BannerKind::Error => egui::Color32::from_rgb(192, 66, 66),
            };
            ui.colored_label(color, active.banner.text.as_str());
            ui.separator();
        }
    }

    fn show_signup_form(&mut self, ui: &mut egui::Ui) {
        ui.heading("Sign up");
        ui.horizontal(|ui| {
            ui.label("Email:");
            ui.add(
                egui::TextEdit::singleline(&mut self.email_input)
                    .hint_text("you@example.com")
                    .desired_width(240.0),
            );

            egui::ComboBox::from_label("Activity")
                .selected_text(
                    self.selected_activity
                        .as_deref()
                        .unwrap_or(SELECT_PLACEHOLDER),
                )
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut self.selected_activity, None, SELECT_PLACEHOLDER);
                    for name in &self.option_names {
                        ui.selectable_value(
                            &mut self.selected_activity,
                            Some(name.clone()),
                            name.as_str(),
                        );
                    }
                });

            let ready = !self.email_input.trim().is_empty() && self.selected_activity.is_some();
            if ui.add_enabled(ready, egui::Button::new("Sign Up")).clicked() {
                if let Some(activity) = self.selected_activity.clone() {
                    dispatch_backend_command(
                        &self.cmd_tx,
                        BackendCommand::SignUp {
                            activity,
                            email: self.email_input.trim().to_string(),
                        },
                        &mut self.status,
                    );
                }
            }
        });
    }

    fn show_activity_list(&mut self, ui: &mut egui::Ui) {
        ui.heading("Activities");
        if self.directory_unavailable {
            ui.label(DIRECTORY_UNAVAILABLE_MESSAGE);
            return;
        }

        let mut removal: Option<(String, String)> = None;
        egui::ScrollArea::vertical()
            .auto_shrink(false)
            .show(ui, |ui| {
                for card in &self.cards {
                    ui.group(|ui| {
                        ui.strong(card.name.as_str());
                        ui.label(card.description.as_str());
                        ui.label(format!("Schedule: {}", card.schedule));
                        ui.label(format!("Availability: {} spots left", card.spots_left));
                        if card.participants.is_empty() {
                            ui.weak("No participants yet");
                        } else {
                            ui.label("Participants:");
                            for email in &card.participants {
                                ui.horizontal(|ui| {
                                    ui.label(email.as_str());
                                    if ui
                                        .small_button("✕")
                                        .on_hover_text(format!("Unregister {email}"))
                                        .clicked()
                                    {
                                        removal = Some((card.name.clone(), email.clone()));
                                    }
                                });
                            }
                        }
                    });
                }
            });

        if let Some((activity, email)) = removal {
            dispatch_backend_command(
                &self.cmd_tx,
                BackendCommand::Unregister { activity, email },
                &mut self.status,
            );
        }
    }
}

impl eframe::App for ActivityDeskApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_ui_events();
        self.expire_banner(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Activity Desk");
            ui.separator();
            self.show_banner(ui);
            self.show_signup_form(ui);
            ui.separator();
            self.show_activity_list(ui);
            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Refresh").clicked() {
                    dispatch_backend_command(
                        &self.cmd_tx,
                        BackendCommand::ReloadDirectory,
                        &mut self.status,
                    );
                }
                ui.small(self.status.as_str());
            });
        });

        // Events arrive from the worker thread at any time.
        ctx.request_repaint_after(Duration::from_millis(250));
    }
}

pub fn start_backend_bridge(
    settings: Settings,
    cmd_rx: Receiver<BackendCommand>,
    ui_tx: Sender<UiEvent>,
) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                    UiErrorContext::BackendStartup,
                    format!("backend worker startup failure: failed to build runtime: {err}"),
                )));
                tracing::error!("failed to build backend runtime: {err}");
                return;
            }
        };

        runtime.block_on(async move {
            let api = match HttpActivitiesApi::new(&settings.server_url) {
                Ok(api) => api,
                Err(err) => {
                    let _ = ui_tx.try_send(UiEvent::Error(UiError::from_message(
                        UiErrorContext::BackendStartup,
                        format!("backend worker startup failure: {err}"),
                    )));
                    tracing::error!("failed to build activities api client: {err}");
                    return;
                }
            };
            let client = DirectoryClient::new(Arc::new(api));

            let mut events = client.subscribe_events();
            let ui_tx_clone = ui_tx.clone();
            tokio::spawn(async move {
                while let Ok(event) = events.recv().await {
                    let evt = match event {
                        ClientEvent::DirectoryReplaced { directory } => {
                            UiEvent::DirectoryReplaced(ActivityCard::from_directory(&directory))
                        }
                        ClientEvent::DirectoryUnavailable => UiEvent::DirectoryUnavailable,
                        ClientEvent::BannerRaised(banner) => UiEvent::BannerRaised(banner),
                    };
                    let _ = ui_tx_clone.try_send(evt);
                }
            });

            let _ = ui_tx.try_send(UiEvent::BackendReady);

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    BackendCommand::ReloadDirectory => {
                        tracing::info!("backend: reload_directory");
                        if let Err(err) = client.reload_directory().await {
                            tracing::error!("backend: reload_directory failed: {err}");
                        }
                    }
                    BackendCommand::SignUp { activity, email } => {
                        tracing::info!(activity = %activity, "backend: sign_up");
                        match client.sign_up(&activity, &email).await {
                            Ok(_) => {
                                let _ = ui_tx.try_send(UiEvent::SignupAccepted);
                            }
                            // Failure banners already flow through the event stream.
                            Err(err) => tracing::warn!("backend: sign_up failed: {err}"),
                        }
                    }
                    BackendCommand::Unregister { activity, email } => {
                        tracing::info!(activity = %activity, "backend: unregister");
                        if let Err(err) = client.unregister(&activity, &email).await {
                            tracing::warn!("backend: unregister failed: {err}");
                        }
                    }
                }
            }
        });
    });
}
