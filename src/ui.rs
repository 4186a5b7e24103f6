use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use electric_billing::config::ExportSettings;
use electric_billing::{
    compute_bill, parse_reading, render_text, write_statement, AccountStore, Bill,
    BillStatement, BillingError, Customer, CustomerClass, DiscountClass,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

const PAGE_STEP: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Accounts,
    Bill,
    NewAccount,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Accounts => Page::Bill,
            Page::Bill => Page::NewAccount,
            Page::NewAccount => Page::Accounts,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Accounts => Page::NewAccount,
            Page::Bill => Page::Accounts,
            Page::NewAccount => Page::Bill,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Accounts => "Accounts",
            Page::Bill => "Bill",
            Page::NewAccount => "New Account",
        }
    }
}

/// What keystrokes are currently feeding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Search,
    Reading,
    Form,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Address,
    Class,
    Discount,
}

impl FormField {
    fn next(&self) -> Self {
        match self {
            FormField::Name => FormField::Address,
            FormField::Address => FormField::Class,
            FormField::Class => FormField::Discount,
            FormField::Discount => FormField::Name,
        }
    }

    fn previous(&self) -> Self {
        match self {
            FormField::Name => FormField::Discount,
            FormField::Address => FormField::Name,
            FormField::Class => FormField::Address,
            FormField::Discount => FormField::Class,
        }
    }
}

/// New-account form
#[derive(Debug, Clone)]
pub struct AccountForm {
    pub name: String,
    pub address: String,
    pub class_index: usize,
    pub discount_index: usize,
    pub field: FormField,
}

impl Default for AccountForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            address: String::new(),
            class_index: 0,
            discount_index: 0,
            field: FormField::Name,
        }
    }
}

impl AccountForm {
    pub fn customer_class(&self) -> CustomerClass {
        CustomerClass::ALL[self.class_index]
    }

    pub fn discount_class(&self) -> DiscountClass {
        DiscountClass::ALL[self.discount_index]
    }

    fn cycle(&mut self, forward: bool) {
        let (index, len) = match self.field {
            FormField::Class => (&mut self.class_index, CustomerClass::ALL.len()),
            FormField::Discount => (&mut self.discount_index, DiscountClass::ALL.len()),
            FormField::Name | FormField::Address => return,
        };
        *index = if forward {
            (*index + 1) % len
        } else {
            (*index + len - 1) % len
        };
    }

    fn text_field(&mut self) -> Option<&mut String> {
        match self.field {
            FormField::Name => Some(&mut self.name),
            FormField::Address => Some(&mut self.address),
            FormField::Class | FormField::Discount => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

pub struct App {
    store: AccountStore,
    export: ExportSettings,
    pub customers: Vec<Customer>,
    pub state: TableState,
    pub current_page: Page,
    pub mode: InputMode,
    pub show_detail: bool,
    pub search: String,
    pub input: String,
    pub form: AccountForm,
    pub last_bill: Option<(Customer, Bill)>,
    pub pending_delete: Option<u32>,
    pub status: Option<StatusMessage>,
}

impl App {
    pub fn new(store: AccountStore, export: ExportSettings) -> electric_billing::Result<Self> {
        let mut app = Self {
            store,
            export,
            customers: Vec::new(),
            state: TableState::default(),
            current_page: Page::Accounts,
            mode: InputMode::Normal,
            show_detail: false,
            search: String::new(),
            input: String::new(),
            form: AccountForm::default(),
            last_bill: None,
            pending_delete: None,
            status: None,
        };
        app.refresh()?;
        Ok(app)
    }

    /// Reload the table, applying the current search text
    pub fn refresh(&mut self) -> electric_billing::Result<()> {
        self.customers = if self.search.is_empty() {
            self.store.list_accounts()?
        } else {
            self.store.search_by_name(&self.search)?
        };

        let selected = match self.state.selected() {
            _ if self.customers.is_empty() => None,
            Some(i) => Some(i.min(self.customers.len() - 1)),
            None => Some(0),
        };
        self.state.select(selected);
        Ok(())
    }

    pub fn selected_customer(&self) -> Option<&Customer> {
        self.state.selected().and_then(|i| self.customers.get(i))
    }

    fn info(&mut self, text: impl Into<String>) {
        self.status = Some(StatusMessage {
            text: text.into(),
            is_error: false,
        });
    }

    fn error(&mut self, err: BillingError) {
        let text = if err.is_expected() {
            err.to_string()
        } else {
            format!("Unexpected error, nothing was saved: {}", err)
        };
        self.status = Some(StatusMessage {
            text,
            is_error: true,
        });
    }

    fn refresh_or_report(&mut self) {
        if let Err(err) = self.refresh() {
            self.error(err);
        }
    }

    // ========================================================================
    // ACTIONS
    // ========================================================================

    /// Bill the selected customer for the typed reading
    pub fn submit_reading(&mut self) {
        let Some(account_number) = self.selected_customer().map(|c| c.account_number) else {
            self.info("No customer selected");
            return;
        };

        let result = parse_reading(&self.input)
            .and_then(|kwh| self.store.bill_account(account_number, kwh));

        match result {
            Ok((customer, bill)) => {
                self.info(format!(
                    "Billed {} for {:.2} kWh: ₱{:.2}",
                    customer.account_number, bill.kwh_used, bill.total_amount_due
                ));
                self.last_bill = Some((customer, bill));
                self.current_page = Page::Bill;
                self.input.clear();
                self.mode = InputMode::Normal;
                self.refresh_or_report();
            }
            Err(err) => self.error(err),
        }
    }

    /// Write the last bill in the configured default format
    pub fn export_last_bill(&mut self) {
        let Some((customer, bill)) = self.last_bill.clone() else {
            self.info("Nothing to export yet, bill a customer first");
            return;
        };

        let statement = BillStatement::new(customer, bill);
        match write_statement(&self.export.directory, &statement, self.export.default_format) {
            Ok(path) => self.info(format!("Bill saved to {}", path.display())),
            Err(err) => self.error(err),
        }
    }

    /// First press arms, second press on the same account deletes
    pub fn delete_selected(&mut self) {
        let Some(account_number) = self.selected_customer().map(|c| c.account_number) else {
            return;
        };

        if self.pending_delete != Some(account_number) {
            self.pending_delete = Some(account_number);
            self.info(format!("Press d again to delete account {}", account_number));
            return;
        }

        self.pending_delete = None;
        match self.store.delete_account(account_number) {
            Ok(true) => self.info(format!("Account {} deleted", account_number)),
            Ok(false) => self.error(BillingError::NotFound {
                account: account_number,
            }),
            Err(err) => self.error(err),
        }
        self.refresh_or_report();
    }

    pub fn submit_form(&mut self) {
        let name = self.form.name.trim().to_string();
        if name.is_empty() {
            self.error(BillingError::invalid_input("Customer name is required"));
            return;
        }

        let result = self.store.open_account(
            &name,
            self.form.address.trim(),
            self.form.customer_class(),
            self.form.discount_class(),
        );

        match result {
            Ok(account_number) => {
                self.info(format!("Account created! Account Number: {}", account_number));
                self.form = AccountForm::default();
                self.mode = InputMode::Normal;
                self.current_page = Page::Accounts;
                self.refresh_or_report();
                if let Some(i) = self
                    .customers
                    .iter()
                    .position(|c| c.account_number == account_number)
                {
                    self.state.select(Some(i));
                }
            }
            Err(err) => self.error(err),
        }
    }

    // ========================================================================
    // NAVIGATION
    // ========================================================================

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
        self.sync_mode_with_page();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
        self.sync_mode_with_page();
    }

    fn sync_mode_with_page(&mut self) {
        self.mode = if self.current_page == Page::NewAccount {
            InputMode::Form
        } else {
            InputMode::Normal
        };
    }

    pub fn next(&mut self) {
        let len = self.customers.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.customers.len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(0) => len - 1,
            Some(i) => i - 1,
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.customers.len();
        if len == 0 {
            return;
        }
        let i = self
            .state
            .selected()
            .map(|i| (i + PAGE_STEP).min(len - 1))
            .unwrap_or(0);
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        if self.customers.is_empty() {
            return;
        }
        let i = self
            .state
            .selected()
            .map(|i| i.saturating_sub(PAGE_STEP))
            .unwrap_or(0);
        self.state.select(Some(i));
    }

    // ========================================================================
    // KEY HANDLING
    // ========================================================================

    /// Apply one key press. Returns true when the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.code != KeyCode::Char('d') {
            self.pending_delete = None;
        }

        match self.mode {
            InputMode::Normal => return self.handle_normal_key(key),
            InputMode::Search => self.handle_search_key(key),
            InputMode::Reading => self.handle_reading_key(key),
            InputMode::Form => self.handle_form_key(key),
        }
        false
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab => self.next_page(),
            KeyCode::BackTab => self.previous_page(),
            KeyCode::Enter => self.show_detail = !self.show_detail,
            KeyCode::Char('/') => {
                self.current_page = Page::Accounts;
                self.mode = InputMode::Search;
            }
            KeyCode::Char('b') if self.selected_customer().is_some() => {
                self.input.clear();
                self.mode = InputMode::Reading;
            }
            KeyCode::Char('x') => self.export_last_bill(),
            KeyCode::Char('d') if self.current_page == Page::Accounts => self.delete_selected(),
            KeyCode::Char('n') => {
                self.current_page = Page::NewAccount;
                self.mode = InputMode::Form;
            }
            KeyCode::Char('c') => {
                self.search.clear();
                self.refresh_or_report();
            }
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            KeyCode::PageDown => self.page_down(),
            KeyCode::PageUp => self.page_up(),
            KeyCode::Home if !self.customers.is_empty() => self.state.select(Some(0)),
            KeyCode::End if !self.customers.is_empty() => {
                self.state.select(Some(self.customers.len() - 1))
            }
            _ => {}
        }
        false
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.mode = InputMode::Normal,
            KeyCode::Esc => {
                self.search.clear();
                self.mode = InputMode::Normal;
                self.refresh_or_report();
            }
            KeyCode::Backspace => {
                self.search.pop();
                self.refresh_or_report();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.search.push(c);
                self.refresh_or_report();
            }
            _ => {}
        }
    }

    fn handle_reading_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.submit_reading(),
            KeyCode::Esc => {
                self.input.clear();
                self.mode = InputMode::Normal;
            }
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() || c == '.' || c == '-' => self.input.push(c),
            _ => {}
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.form = AccountForm::default();
                self.current_page = Page::Accounts;
                self.mode = InputMode::Normal;
            }
            KeyCode::Enter => self.submit_form(),
            KeyCode::Down | KeyCode::Tab => self.form.field = self.form.field.next(),
            KeyCode::Up | KeyCode::BackTab => self.form.field = self.form.field.previous(),
            KeyCode::Right => self.form.cycle(true),
            KeyCode::Left => self.form.cycle(false),
            KeyCode::Backspace => {
                if let Some(text) = self.form.text_field() {
                    text.pop();
                }
            }
            KeyCode::Char(c) => {
                if let Some(text) = self.form.text_field() {
                    text.push(c);
                } else if c == ' ' {
                    self.form.cycle(true);
                }
            }
            _ => {}
        }
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if app.handle_key(key) {
                return Ok(());
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar / input line
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Accounts if app.show_detail => {
            let content_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(chunks[1]);

            render_accounts(f, content_chunks[0], app);
            render_detail_panel(f, content_chunks[1], app);
        }
        Page::Accounts => render_accounts(f, chunks[1], app),
        Page::Bill => render_bill(f, chunks[1], app),
        Page::NewAccount => render_form(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut tab_spans = vec![];
    for (i, page) in [Page::Accounts, Page::Bill, Page::NewAccount].iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Customers: {}", app.customers.len()),
        Style::default().fg(Color::White),
    ));

    if !app.search.is_empty() {
        tab_spans.push(Span::raw("  |  "));
        tab_spans.push(Span::styled(
            format!("Search: \"{}\"", app.search),
            Style::default().fg(Color::Green),
        ));
    }

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Electricity Billing System "),
    );

    f.render_widget(header, area);
}

fn render_accounts(f: &mut Frame, area: Rect, app: &mut App) {
    let header_cells = ["Account", "Name", "Type", "Discount", "Usage", "Total Usage"]
        .iter()
        .map(|h| {
            Cell::from(*h).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = app.customers.iter().map(|c| {
        let discount_color = if c.discount_class == DiscountClass::None {
            Color::White
        } else {
            Color::Green
        };

        Row::new(vec![
            Cell::from(c.account_number.to_string()),
            Cell::from(truncate(&c.name, 28)),
            Cell::from(c.customer_class.as_str()),
            Cell::from(c.discount_class.as_str()).style(Style::default().fg(discount_color)),
            Cell::from(format!("{:.2}", c.current_usage)),
            Cell::from(format!("{:.2}", c.lifetime_usage)),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(9),
            Constraint::Length(30),
            Constraint::Length(12),
            Constraint::Length(15),
            Constraint::Length(10),
            Constraint::Length(12),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Customers "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn detail_line(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("{:<16}", label),
            Style::default().fg(Color::Yellow),
        ),
        Span::raw(value),
    ])
}

fn render_detail_panel(f: &mut Frame, area: Rect, app: &App) {
    let lines = match app.selected_customer() {
        Some(c) => {
            let mut lines = vec![
                detail_line("Account Number", c.account_number.to_string()),
                detail_line("Name", c.name.clone()),
                detail_line("Address", c.address.clone()),
                detail_line("Customer Type", c.customer_class.to_string()),
                detail_line("Discount", c.discount_class.to_string()),
                detail_line("Current Usage", format!("{:.2} kWh", c.current_usage)),
                detail_line("All-Time Usage", format!("{:.2} kWh", c.lifetime_usage)),
                Line::from(""),
            ];

            // What the stored reading came to
            if let Ok(bill) = compute_bill(c.current_usage, c.discount_class) {
                lines.push(detail_line("Rate", format!("₱{:.2} per kWh", bill.rate)));
                lines.push(detail_line(
                    "Last Bill",
                    format!("₱{:.2}", bill.total_amount_due),
                ));
            }
            lines
        }
        None => vec![Line::from("No customer selected")],
    };

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Details "),
    );

    f.render_widget(panel, area);
}

fn render_bill(f: &mut Frame, area: Rect, app: &App) {
    let lines: Vec<Line> = match &app.last_bill {
        Some((customer, bill)) => render_text(customer, bill)
            .lines()
            .map(|l| Line::from(l.to_string()))
            .collect(),
        None => vec![
            Line::from("No bill yet."),
            Line::from(""),
            Line::from("Select a customer on the Accounts page and press 'b' to enter a reading."),
        ],
    };

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Bill "),
    );

    f.render_widget(panel, area);
}

fn render_form(f: &mut Frame, area: Rect, app: &App) {
    let form = &app.form;
    let field_style = |field: FormField| {
        if form.field == field && app.mode == InputMode::Form {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        }
    };

    let lines = vec![
        Line::from(vec![
            Span::styled("Customer Name:  ", field_style(FormField::Name)),
            Span::raw(form.name.clone()),
        ]),
        Line::from(vec![
            Span::styled("Address:        ", field_style(FormField::Address)),
            Span::raw(form.address.clone()),
        ]),
        Line::from(vec![
            Span::styled("Customer Type:  ", field_style(FormField::Class)),
            Span::raw(format!("◀ {} ▶", form.customer_class())),
        ]),
        Line::from(vec![
            Span::styled("Discount:       ", field_style(FormField::Discount)),
            Span::raw(format!("◀ {} ▶", form.discount_class())),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "↑/↓ field | ←/→ choose | Enter create | Esc cancel",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Create New Account "),
    );

    f.render_widget(panel, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let key = |k: &'static str| Span::styled(k, Style::default().fg(Color::Yellow));

    let spans = match app.mode {
        InputMode::Search => vec![
            Span::styled(" Search name: ", Style::default().fg(Color::Cyan)),
            Span::raw(format!("{}▏", app.search)),
            Span::raw("  ("),
            key("Enter"),
            Span::raw(" keep, "),
            key("Esc"),
            Span::raw(" clear)"),
        ],
        InputMode::Reading => {
            let account = app
                .selected_customer()
                .map(|c| c.account_number.to_string())
                .unwrap_or_default();
            vec![
                Span::styled(
                    format!(" kWh used for {}: ", account),
                    Style::default().fg(Color::Cyan),
                ),
                Span::raw(format!("{}▏", app.input)),
                Span::raw("  ("),
                key("Enter"),
                Span::raw(" bill, "),
                key("Esc"),
                Span::raw(" cancel)"),
            ]
        }
        InputMode::Normal | InputMode::Form => {
            let mut spans = vec![];
            if let Some(status) = &app.status {
                let color = if status.is_error { Color::Red } else { Color::Green };
                spans.push(Span::styled(
                    format!(" {} ", status.text),
                    Style::default().fg(color),
                ));
                spans.push(Span::raw("| "));
            }
            spans.extend([
                key("/"),
                Span::raw(" Search | "),
                key("b"),
                Span::raw(" Bill | "),
                key("x"),
                Span::raw(" Export | "),
                key("n"),
                Span::raw(" New | "),
                key("d"),
                Span::raw(" Delete | "),
                key("Tab"),
                Span::raw(" Page | "),
                Span::styled("q", Style::default().fg(Color::Red)),
                Span::raw(" Quit"),
            ]);
            spans
        }
    };

    let status_bar = Paragraph::new(vec![Line::from(spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}
