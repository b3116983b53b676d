use std::fmt::{self, Write};

/// A row of cells. Header cells must not contain whitespace so that a headed
/// table can still be split with `awk`.
pub(crate) struct Row {
    cells: Vec<String>,
}

impl Row {
    fn is_awk_safe(&self) -> bool {
        !self
            .cells
            .iter()
            .any(|cell| cell.contains(char::is_whitespace))
    }
}

impl From<Vec<String>> for Row {
    fn from(cells: Vec<String>) -> Self {
        Row { cells }
    }
}

impl From<Vec<&str>> for Row {
    fn from(cells: Vec<&str>) -> Self {
        Row {
            cells: cells.into_iter().map(str::to_owned).collect(),
        }
    }
}

/// A left-aligned plain text table with two spaces between columns
pub(crate) struct Table {
    header: Option<Row>,
    body: Vec<Row>,
    columns: Option<usize>,
    print_header: bool,
}

impl Table {
    pub(crate) fn new() -> Table {
        Table {
            header: None,
            body: Vec::new(),
            columns: None,
            print_header: true,
        }
    }

    fn check_columns(&mut self, row: &Row) {
        let columns = *self.columns.get_or_insert(row.cells.len());

        assert_eq!(
            columns,
            row.cells.len(),
            "every row of a table needs the same number of columns"
        );
    }

    pub(crate) fn print_header(&mut self, print_header: bool) {
        self.print_header = print_header;
    }

    pub(crate) fn set_header<R: Into<Row>>(&mut self, header: R) {
        let header = header.into();

        assert!(header.is_awk_safe(), "table header contains whitespace");

        self.check_columns(&header);

        self.header = Some(header);
    }

    pub(crate) fn add_row<R: Into<Row>>(&mut self, row: R) {
        let row = row.into();

        self.check_columns(&row);

        self.body.push(row);
    }

    fn visible_rows(&self) -> impl Iterator<Item = &Row> {
        let header = self.header.iter().filter(|_| self.print_header);

        header.chain(self.body.iter())
    }

    fn column_widths(&self) -> Vec<usize> {
        let mut widths = vec![0usize; self.columns.unwrap_or(0)];

        for row in self.visible_rows() {
            for (width, cell) in widths.iter_mut().zip(&row.cells) {
                *width = (*width).max(cell.chars().count());
            }
        }

        widths
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.column_widths();

        for row in self.visible_rows() {
            let last = row.cells.len().saturating_sub(1);

            for (i, cell) in row.cells.iter().enumerate() {
                if i == last {
                    f.write_str(cell)?;
                } else {
                    write!(f, "{:<width$}  ", cell, width = widths[i])?;
                }
            }

            f.write_char('\n')?;
        }

        Ok(())
    }
}
