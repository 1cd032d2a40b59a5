use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame,
};
use spacetrader_core::{
    chat::ChatKind,
    economy::{self, format_credits},
    engine::{Notice, NoticeLevel, Screen, SessionContext},
    models::{Auction, Bounty, Contract, Loadout},
    screens::{
        services::{self, ServiceKind},
        station::MENU,
        Form, MarketMode, MarketState, MarketTab, MissionState, OutfitterMode, OutfitterState,
        OutfitterView, ServicesState, StationState,
    },
    SessionState,
};

#[derive(Debug, Clone)]
pub struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    success: Color,
    warning: Color,
    danger: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            success: Color::Green,
            warning: Color::Yellow,
            danger: Color::Red,
        }
    }
}

/// Draw the whole session.
pub fn draw(frame: &mut Frame, state: &SessionState, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
        ])
        .split(frame.size());

    render_header(frame, chunks[0], state, theme);
    let ctx = &state.ctx;
    match &state.screen {
        Screen::Station(menu) => render_station(frame, chunks[1], ctx, menu, theme),
        Screen::Chat => render_chat(frame, chunks[1], ctx, theme),
        Screen::Outfitter(shop) => render_outfitter(frame, chunks[1], shop, theme),
        Screen::Services(desk) => render_services(frame, chunks[1], ctx, desk, theme),
        Screen::Marketplace(market) => render_market(frame, chunks[1], ctx, market, theme),
        Screen::Missions(board) => render_missions(frame, chunks[1], board, theme),
    }
    render_status(frame, chunks[2], state, theme);

    if let Some(notice) = ctx.notice.as_ref().filter(|n| n.level == NoticeLevel::Error) {
        render_error_dialog(frame, notice, theme);
    }
}

fn render_header(frame: &mut Frame, area: Rect, state: &SessionState, theme: &Theme) {
    let ctx = &state.ctx;
    let mut spans = vec![
        Span::styled(
            ctx.player.username.clone(),
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("  {} cr", format_credits(ctx.player.credits))),
        Span::styled(
            format!(
                "  {}  hull {}/{}  shields {}/{}  fuel {}/{}",
                ctx.ship.name,
                ctx.ship.hull,
                ctx.ship_type.max_hull,
                ctx.ship.shields,
                ctx.ship_type.max_shields,
                ctx.ship.fuel,
                ctx.ship_type.max_fuel
            ),
            Style::default().fg(theme.muted),
        ),
    ];
    if ctx.chat.unread > 0 {
        spans.push(Span::styled(
            format!("  [{} unread]", ctx.chat.unread),
            Style::default().fg(theme.warning),
        ));
    }
    let title = format!("SpaceTrader · {}", state.screen_kind().title());
    let paragraph = Paragraph::new(Line::from(spans))
        .block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(paragraph, area);
}

fn render_status(frame: &mut Frame, area: Rect, state: &SessionState, theme: &Theme) {
    let ctx = &state.ctx;
    let line = match &ctx.notice {
        Some(notice) if notice.level != NoticeLevel::Error => {
            let color = match notice.level {
                NoticeLevel::Info => theme.success,
                _ => theme.warning,
            };
            Line::from(Span::styled(notice.text.clone(), Style::default().fg(color)))
        }
        _ => Line::from(Span::styled(
            key_hints(&state.screen),
            Style::default().fg(theme.muted),
        )),
    };
    let title = if ctx.in_flight.is_empty() {
        "Status".to_string()
    } else {
        format!("Status · working ({})", ctx.in_flight.len())
    };
    let paragraph = Paragraph::new(line)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn key_hints(screen: &Screen) -> &'static str {
    match screen {
        Screen::Station(_) => "↑↓ move  Enter select  1-6 jump  r refresh  q quit",
        Screen::Chat => "Enter talk  / command  Tab channel  Esc back",
        Screen::Outfitter(shop) => match (&shop.mode, shop.view) {
            (OutfitterMode::PickItem { .. }, _) => "↑↓ choose  Enter install  Esc cancel",
            (OutfitterMode::NameLoadout(_), _) => "Type a name  Enter create  Esc cancel",
            (_, OutfitterView::Catalog) => "Tab view  ←→ category  +/- qty  Enter buy  Esc back",
            (_, OutfitterView::Inventory) => "Tab view  +/- qty  Enter sell  Esc back",
            (_, OutfitterView::Loadouts) if shop.open_loadout.is_some() => {
                "↑↓ slot  Enter fill  u remove  Esc close"
            }
            (_, OutfitterView::Loadouts) => "Tab view  Enter open  n new  Esc back",
        },
        Screen::Services(_) => "↑↓ move  Enter buy  f fuel  h hull  s shields  a all  Esc back",
        Screen::Marketplace(market) => match market.mode {
            MarketMode::Create(_) => "Tab next field  Enter submit  Esc cancel",
            MarketMode::Detail(_) => match market.tab {
                MarketTab::Auctions => "b bid  o buyout  x cancel  Esc close",
                MarketTab::Contracts => "c claim  d complete  x withdraw  Esc close",
                MarketTab::Bounties => "Esc close",
            },
            MarketMode::Browse => "Tab tab  ↑↓ move  Enter details  n new  r refresh  Esc back",
        },
        Screen::Missions(_) => "↑↓ move  Enter accept  x abandon  r refresh  Esc back",
    }
}

fn render_error_dialog(frame: &mut Frame, notice: &Notice, theme: &Theme) {
    let area = centered_rect(64, 8, frame.size());
    frame.render_widget(Clear, area);
    let paragraph = Paragraph::new(vec![
        Line::from(notice.text.clone()),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key to continue",
            Style::default().fg(theme.muted),
        )),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.danger))
            .title("Error"),
    )
    .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_station(
    frame: &mut Frame,
    area: Rect,
    ctx: &SessionContext,
    menu: &StationState,
    theme: &Theme,
) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let items: Vec<ListItem> = MENU
        .iter()
        .enumerate()
        .map(|(idx, (label, _))| ListItem::new(format!("{}. {label}", idx + 1)))
        .collect();
    render_list(frame, columns[0], "Station", items, Some(menu.cursor), theme);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(columns[1]);
    let ty = &ctx.ship_type;
    render_gauge(frame, rows[0], "Hull", ctx.ship.hull, ty.max_hull, theme.success);
    render_gauge(frame, rows[1], "Shields", ctx.ship.shields, ty.max_shields, theme.accent);
    render_gauge(frame, rows[2], "Fuel", ctx.ship.fuel, ty.max_fuel, theme.warning);

    let faction = ctx.player.faction.as_deref().unwrap_or("independent");
    let details = Paragraph::new(vec![
        Line::from(format!("{} ({})", ctx.ship.name, ty.name)),
        Line::from(format!("System {}  ·  {faction}", ctx.player.system_id)),
        Line::from(format!("Cargo {}/{}", ctx.ship.cargo, ty.max_cargo)),
    ])
    .block(Block::default().borders(Borders::ALL).title("Ship"));
    frame.render_widget(details, rows[3]);
}

fn render_chat(frame: &mut Frame, area: Rect, ctx: &SessionContext, theme: &Theme) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)])
        .split(area);

    let chat = &ctx.chat;
    let visible = rows[0].height.saturating_sub(2) as usize;
    let skip = chat.log.len().saturating_sub(visible);
    let lines: Vec<Line> = chat
        .log
        .iter()
        .skip(skip)
        .map(|entry| {
            let style = match entry.kind {
                ChatKind::System => Style::default().fg(theme.muted),
                ChatKind::Emote => Style::default().add_modifier(Modifier::ITALIC),
                ChatKind::Say if entry.sender == Some(ctx.player.id) => {
                    Style::default().fg(theme.accent)
                }
                ChatKind::Say => Style::default().fg(theme.primary_fg),
            };
            Line::from(Span::styled(entry.display_line(), style))
        })
        .collect();
    let mut title = format!("Channel: {}", chat.channel);
    if let Some(target) = &chat.dm_target {
        title.push_str(&format!("  (DM {target})"));
    }
    let log = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });
    frame.render_widget(log, rows[0]);

    let input = if chat.composer.is_composing() {
        Line::from(vec![
            Span::styled("> ", Style::default().fg(theme.accent)),
            Span::raw(chat.composer.buffer().to_string()),
        ])
    } else {
        Line::from(Span::styled(
            "Press Enter to talk",
            Style::default().fg(theme.muted),
        ))
    };
    let composer = Paragraph::new(input).block(Block::default().borders(Borders::ALL));
    frame.render_widget(composer, rows[1]);
    if chat.composer.is_composing() {
        let width = chat.composer.buffer().chars().count() as u16;
        let x = (rows[1].x + 3 + width).min(rows[1].x + rows[1].width.saturating_sub(2));
        frame.set_cursor(x, rows[1].y + 1);
    }
}

fn render_outfitter(frame: &mut Frame, area: Rect, shop: &OutfitterState, theme: &Theme) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);

    let views = [
        OutfitterView::Catalog,
        OutfitterView::Inventory,
        OutfitterView::Loadouts,
    ];
    let selected = views.iter().position(|v| *v == shop.view).unwrap_or(0);
    render_tabs(
        frame,
        rows[0],
        views.iter().map(|v| v.label()).collect(),
        selected,
        theme,
    );

    match shop.view {
        OutfitterView::Catalog => {
            let items: Vec<ListItem> = shop
                .catalog
                .iter()
                .map(|item| {
                    ListItem::new(format!(
                        "{:<22} size {}  {:>8} cr",
                        item.name,
                        item.size,
                        format_credits(item.price)
                    ))
                })
                .collect();
            let title = format!("{}  ·  qty {}", shop.category, shop.quantity);
            render_list(frame, rows[1], &title, items, Some(shop.cursor), theme);
        }
        OutfitterView::Inventory => {
            let items: Vec<ListItem> = shop
                .inventory
                .items
                .iter()
                .map(|stack| {
                    ListItem::new(format!(
                        "{:<22} x{:<3} resale {} cr each",
                        stack.equipment.name,
                        stack.quantity,
                        format_credits(economy::resale_value(stack.equipment.price, 1))
                    ))
                })
                .collect();
            let title = format!("Inventory  ·  qty {}", shop.quantity);
            render_list(frame, rows[1], &title, items, Some(shop.cursor), theme);
        }
        OutfitterView::Loadouts => match shop.open_loadout() {
            Some(loadout) => render_slots(frame, rows[1], loadout, shop.slot_cursor, theme),
            None => {
                let items: Vec<ListItem> = shop
                    .loadouts
                    .iter()
                    .map(|l| {
                        ListItem::new(format!(
                            "{:<20} {:<12} space {}/{}",
                            l.name,
                            l.ship_type,
                            l.used_space(),
                            l.total_space()
                        ))
                    })
                    .collect();
                render_list(frame, rows[1], "Loadouts", items, Some(shop.cursor), theme);
            }
        },
    }

    match &shop.mode {
        OutfitterMode::Browse => {}
        OutfitterMode::PickItem { slot, cursor } => {
            let candidates = shop
                .open_loadout()
                .and_then(|l| l.slot(*slot))
                .map(|s| shop.compatible_items(s))
                .unwrap_or_default();
            let items: Vec<ListItem> = if candidates.is_empty() {
                vec![ListItem::new("No compatible items in inventory")]
            } else {
                candidates
                    .iter()
                    .map(|item| ListItem::new(format!("{} (size {})", item.name, item.size)))
                    .collect()
            };
            let area = centered_rect(48, 10, frame.size());
            frame.render_widget(Clear, area);
            let title = format!("Install into slot {}", slot + 1);
            render_list(frame, area, &title, items, Some(*cursor), theme);
        }
        OutfitterMode::NameLoadout(field) => {
            let area = centered_rect(48, 5, frame.size());
            frame.render_widget(Clear, area);
            let prompt = Paragraph::new(Line::from(vec![
                Span::styled("> ", Style::default().fg(theme.accent)),
                Span::raw(field.value.clone()),
            ]))
            .block(Block::default().borders(Borders::ALL).title("New loadout"));
            frame.render_widget(prompt, area);
        }
    }
}

fn render_slots(frame: &mut Frame, area: Rect, loadout: &Loadout, cursor: usize, theme: &Theme) {
    let items: Vec<ListItem> = loadout
        .slots
        .iter()
        .enumerate()
        .map(|(idx, slot)| {
            let fitted = match &slot.equipment {
                Some(item) => Span::raw(item.name.clone()),
                None => Span::styled("empty", Style::default().fg(theme.muted)),
            };
            ListItem::new(Line::from(vec![
                Span::raw(format!("{}. {:<8} size {}  ", idx + 1, slot.slot_type.label(), slot.size)),
                fitted,
            ]))
        })
        .collect();
    let bonuses = loadout.bonuses();
    let title = format!(
        "{}  ·  space {}/{}  ·  atk {} def {} spd {} cargo {}",
        loadout.name,
        loadout.used_space(),
        loadout.total_space(),
        bonuses.attack,
        bonuses.defense,
        bonuses.speed,
        bonuses.cargo
    );
    render_list(frame, area, &title, items, Some(cursor), theme);
}

fn render_services(
    frame: &mut Frame,
    area: Rect,
    ctx: &SessionContext,
    desk: &ServicesState,
    theme: &Theme,
) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let items: Vec<ListItem> = ServiceKind::ALL
        .iter()
        .map(|kind| {
            let line = match services::quote(*kind, &ctx.ship, &ctx.ship_type) {
                Ok((quote, _)) => Line::from(format!(
                    "{:<18} {} units  {} cr",
                    kind.label(),
                    quote.units,
                    format_credits(quote.cost)
                )),
                Err(err) => Line::from(Span::styled(
                    format!("{:<18} {err}", kind.label()),
                    Style::default().fg(theme.muted),
                )),
            };
            ListItem::new(line)
        })
        .collect();
    render_list(frame, columns[0], "Services", items, Some(desk.cursor), theme);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(columns[1]);
    let ty = &ctx.ship_type;
    render_gauge(frame, rows[0], "Hull", ctx.ship.hull, ty.max_hull, theme.success);
    render_gauge(frame, rows[1], "Shields", ctx.ship.shields, ty.max_shields, theme.accent);
    render_gauge(frame, rows[2], "Fuel", ctx.ship.fuel, ty.max_fuel, theme.warning);
}

fn render_market(
    frame: &mut Frame,
    area: Rect,
    ctx: &SessionContext,
    market: &MarketState,
    theme: &Theme,
) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(area);
    let selected = MarketTab::ALL
        .iter()
        .position(|tab| *tab == market.tab)
        .unwrap_or(0);
    render_tabs(
        frame,
        rows[0],
        MarketTab::ALL.iter().map(|tab| tab.label()).collect(),
        selected,
        theme,
    );

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(68), Constraint::Percentage(32)])
        .split(rows[1]);

    match &market.mode {
        MarketMode::Browse => {
            let items: Vec<ListItem> = match market.tab {
                MarketTab::Auctions => market
                    .auctions
                    .iter()
                    .map(|lot| ListItem::new(auction_row(ctx, lot)))
                    .collect(),
                MarketTab::Contracts => market
                    .contracts
                    .iter()
                    .map(|job| ListItem::new(contract_row(job)))
                    .collect(),
                MarketTab::Bounties => market
                    .bounties
                    .iter()
                    .map(|bounty| ListItem::new(bounty_row(bounty)))
                    .collect(),
            };
            let title = match market.last_refresh {
                Some(at) => format!("{}  ·  updated {}", market.tab.label(), at.format("%H:%M:%S")),
                None => format!("{}  ·  loading", market.tab.label()),
            };
            render_list(frame, columns[0], &title, items, Some(market.cursor), theme);
        }
        MarketMode::Detail(id) => {
            let lines = match market.tab {
                MarketTab::Auctions => market.auction(*id).map(|lot| auction_detail(ctx, lot)),
                MarketTab::Contracts => market.contract(*id).map(contract_detail),
                MarketTab::Bounties => market.bounty(*id).map(bounty_detail),
            }
            .unwrap_or_else(|| vec![Line::from("No longer listed")]);
            let detail = Paragraph::new(lines)
                .block(Block::default().borders(Borders::ALL).title("Details"))
                .wrap(Wrap { trim: true });
            frame.render_widget(detail, columns[0]);
        }
        MarketMode::Create(form) => {
            render_form(frame, columns[0], form.title(), form.form(), theme);
        }
    }

    let history: Vec<ListItem> = market
        .history
        .iter()
        .map(|entry| {
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{} ", entry.closed_at.format("%H:%M")),
                    Style::default().fg(theme.muted),
                ),
                Span::raw(entry.label.clone()),
            ]))
        })
        .collect();
    render_list(frame, columns[1], "Recently closed", history, None, theme);
}

fn auction_row(ctx: &SessionContext, lot: &Auction) -> String {
    let left = lot.time_left(ctx.now);
    format!(
        "{:<18} x{}  bid {:>7}  next {:>7}  {}h{:02}m  {}",
        lot.item.name,
        lot.item.quantity,
        format_credits(lot.current_bid),
        format_credits(lot.minimum_bid()),
        left.num_hours(),
        left.num_minutes() % 60,
        lot.seller_name
    )
}

fn auction_detail(ctx: &SessionContext, lot: &Auction) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(format!("{} x{}", lot.item.name, lot.item.quantity)),
        Line::from(format!("Seller: {}", lot.seller_name)),
        Line::from(format!("Starting bid: {} cr", format_credits(lot.starting_bid))),
        Line::from(format!("Current bid: {} cr", format_credits(lot.current_bid))),
        Line::from(format!("Next bid: {} cr", format_credits(lot.minimum_bid()))),
    ];
    if let Some(price) = lot.buyout() {
        lines.push(Line::from(format!("Buyout: {} cr", format_credits(price))));
    }
    let left = lot.time_left(ctx.now);
    lines.push(Line::from(format!(
        "Ends in {}h {:02}m",
        left.num_hours(),
        left.num_minutes() % 60
    )));
    if let Some(last) = lot.bids.last() {
        lines.push(Line::from(format!(
            "Leading: {} ({} bids)",
            last.bidder_name,
            lot.bids.len()
        )));
    }
    lines
}

fn contract_row(job: &Contract) -> String {
    format!(
        "{:<32} {:>8} cr  {:?}  {}",
        job.target,
        format_credits(job.reward),
        job.status,
        job.poster_name
    )
}

fn contract_detail(job: &Contract) -> Vec<Line<'static>> {
    vec![
        Line::from(job.target.clone()),
        Line::from(format!("Posted by {}", job.poster_name)),
        Line::from(format!("Reward: {} cr", format_credits(job.reward))),
        Line::from(format!("Status: {:?}", job.status)),
        Line::from(format!("Expires {}", job.expires_at.format("%Y-%m-%d %H:%M"))),
    ]
}

fn bounty_row(bounty: &Bounty) -> String {
    format!(
        "{:<16} {:>8} cr  {}",
        bounty.target_name,
        format_credits(bounty.amount),
        bounty.reason
    )
}

fn bounty_detail(bounty: &Bounty) -> Vec<Line<'static>> {
    vec![
        Line::from(format!("Wanted: {}", bounty.target_name)),
        Line::from(format!("Reason: {}", bounty.reason)),
        Line::from(format!("Reward: {} cr", format_credits(bounty.amount))),
        Line::from(format!("Posted by {}", bounty.poster_name)),
        Line::from(format!("Expires {}", bounty.expires_at.format("%Y-%m-%d %H:%M"))),
    ]
}

fn render_form(frame: &mut Frame, area: Rect, title: &str, form: &Form, theme: &Theme) {
    let lines: Vec<Line> = form
        .fields
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            let focused = idx == form.focus;
            let marker = if focused {
                Span::styled("▶ ", Style::default().fg(theme.accent))
            } else {
                Span::raw("  ")
            };
            let label = if field.optional {
                format!("{} (optional): ", field.label)
            } else {
                format!("{}: ", field.label)
            };
            let label_style = if focused {
                Style::default().add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.muted)
            };
            Line::from(vec![
                marker,
                Span::styled(label, label_style),
                Span::raw(field.value.clone()),
            ])
        })
        .collect();
    let paragraph = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()));
    frame.render_widget(paragraph, area);
}

fn render_missions(frame: &mut Frame, area: Rect, board: &MissionState, theme: &Theme) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let items: Vec<ListItem> = board
        .available
        .iter()
        .map(|m| {
            ListItem::new(format!(
                "{:<24} {:>7} cr  → system {}",
                m.title,
                format_credits(m.reward),
                m.destination
            ))
        })
        .collect();
    render_list(frame, columns[0], "Available", items, Some(board.cursor), theme);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(columns[1]);
    let briefing = match board.selected() {
        Some(m) => vec![
            Line::from(Span::styled(
                m.title.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(m.description.clone()),
            Line::from(format!("System {} → {}", m.origin, m.destination)),
            Line::from(format!("Reward: {} cr", format_credits(m.reward))),
        ],
        None => vec![Line::from("No missions on offer here")],
    };
    frame.render_widget(
        Paragraph::new(briefing)
            .block(Block::default().borders(Borders::ALL).title("Briefing"))
            .wrap(Wrap { trim: true }),
        rows[0],
    );
    let active = match &board.active {
        Some(m) => vec![
            Line::from(Span::styled(m.title.clone(), Style::default().fg(theme.accent))),
            Line::from(format!("Deliver to system {}", m.destination)),
            Line::from(format!("Pays {} cr", format_credits(m.reward))),
        ],
        None => vec![Line::from(Span::styled(
            "No active mission",
            Style::default().fg(theme.muted),
        ))],
    };
    frame.render_widget(
        Paragraph::new(active).block(Block::default().borders(Borders::ALL).title("Active")),
        rows[1],
    );
}

fn render_list(
    frame: &mut Frame,
    area: Rect,
    title: &str,
    items: Vec<ListItem>,
    cursor: Option<usize>,
    theme: &Theme,
) {
    let mut list_state = ListState::default();
    if !items.is_empty() {
        list_state.select(cursor.map(|c| c.min(items.len() - 1)));
    }
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .highlight_style(
            Style::default()
                .bg(theme.selection_bg)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");
    frame.render_stateful_widget(list, area, &mut list_state);
}

fn render_tabs(frame: &mut Frame, area: Rect, labels: Vec<&str>, selected: usize, theme: &Theme) {
    let tabs = Tabs::new(labels)
        .block(Block::default().borders(Borders::ALL))
        .select(selected)
        .highlight_style(
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, area);
}

fn render_gauge(frame: &mut Frame, area: Rect, label: &str, value: u32, max: u32, color: Color) {
    let ratio = (f64::from(value) / f64::from(max.max(1))).clamp(0.0, 1.0);
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(label.to_string()))
        .gauge_style(Style::default().fg(color))
        .ratio(ratio)
        .label(format!("{value}/{max}"));
    frame.render_widget(gauge, area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ratatui::{backend::TestBackend, Terminal};
    use spacetrader_core::{
        chat::{Channel, ChatEntry},
        engine::update,
        Message, ScreenKind, SessionSettings, WorldSnapshot,
    };

    fn session() -> SessionState {
        let now = Utc::now();
        let world = WorldSnapshot::demo("pilot", now);
        let player = world
            .players
            .iter()
            .find(|p| p.username == "pilot")
            .cloned()
            .unwrap();
        let ship = world
            .ships
            .iter()
            .find(|s| s.id == player.ship_id)
            .cloned()
            .unwrap();
        let ty = world
            .ship_types
            .iter()
            .find(|t| t.id == ship.ship_type)
            .cloned()
            .unwrap();
        SessionState::new(player, ship, ty, SessionSettings::default(), now)
    }

    fn screen_text(state: &SessionState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(110, 32)).unwrap();
        terminal
            .draw(|frame| draw(frame, state, &Theme::default()))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn every_screen_renders() {
        let mut state = session();
        let now = state.ctx.now;
        update(
            &mut state,
            Message::ChatReceived(ChatEntry::system(Channel::Global, "welcome aboard", now)),
        );
        for kind in [
            ScreenKind::Chat,
            ScreenKind::Outfitter,
            ScreenKind::Services,
            ScreenKind::Marketplace,
            ScreenKind::Missions,
            ScreenKind::Station,
        ] {
            update(&mut state, Message::Navigate(kind));
            let text = screen_text(&state);
            assert!(text.contains(kind.title()), "{kind:?} header missing");
        }
    }

    #[test]
    fn error_notice_is_drawn_as_a_dialog() {
        let mut state = session();
        state.ctx.fail("Refuel failed");
        let text = screen_text(&state);
        assert!(text.contains("Error"));
        assert!(text.contains("Refuel failed"));
        assert!(text.contains("Press any key"));
    }
}
