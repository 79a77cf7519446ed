//! Fixed text of a job script around the backend header and the hook blocks.

use crate::hooks::CalculationEnvironment;
use crate::qsys::EnvironmentBindings;

pub const SHEBANG: &str = "#!/bin/bash\n#\n";

pub const SEPARATOR: &str = "#\n###################################\n#\n";

/// Shell functions every job script defines
pub const FUNCTIONS: &str = concat!(
    r#"print_info() {
    echo ------------------------------------------------------
    echo "Job is running on nodes"
    echo "$NODES" | sed 's/^/    /g'
    echo ------------------------------------------------------
    echo qsys: job was submitted from $SUBMIT_HOST
    echo qsys: originating queue is $SUBMIT_QUEUE
    echo qsys: executing queue is $QUEUE
    echo qsys: original working directory is $SUBMIT_WORKDIR
    echo qsys: job identifier is $JOBID
    echo qsys: job name is $JOBNAME
    echo qsys: current home directory is $O_HOME
    echo qsys: PATH = $O_PATH
    echo ------------------------------------------------------
}

stage_in() {
    rm -f "$SUBMIT_WORKDIR/job_not_successful"

    # create workdir and cd to it.

    if [ -d "$NODE_WORKDIR" ]; then
        local NEWWORKDIR="${NODE_WORKDIR}_${JOBID}"
        echo >&2
        echo "Workdir $NODE_WORKDIR already exists! Proceeding with $NEWWORKDIR." >&2
        NODE_WORKDIR=$NEWWORKDIR
    fi

    if [ -d "$NODE_SCRATCHDIR" ]; then
        local NEWSCRATCHDIR="${NODE_SCRATCHDIR}_${JOBID}"
        echo >&2
        echo "Scratchdir $NODE_SCRATCHDIR already exists! Proceeding with $NEWSCRATCHDIR." >&2
        NODE_SCRATCHDIR=$NEWSCRATCHDIR
    fi

    echo
    echo "Calculation working directory: $NODE_WORKDIR"
    echo "            scratch directory: $NODE_SCRATCHDIR"

    # create scratch dir and work dir
    if ! mkdir -m700 -p "$NODE_SCRATCHDIR" "$NODE_WORKDIR"; then
        echo "Could not create scratch($NODE_SCRATCHDIR) or workdir($NODE_WORKDIR)" >&2
        exit 1
    fi
    cd "$NODE_WORKDIR"

    echo
    echo ------------------------------------------------------
    echo
}

stage_out() {
    if [ "$RETURN_VALUE" != "0" ]; then
        touch "$SUBMIT_WORKDIR/job_not_successful"
    fi

    echo
    echo ------------------------------------------------------
    echo

    echo "Final files in $SUBMIT_WORKDIR:"
    (
        cd "$SUBMIT_WORKDIR"
        ls -l | sed 's/^/    /g'
    )

    echo
    echo "More files can be found in $NODE_WORKDIR and $NODE_SCRATCHDIR on"
    echo "$NODES_UNIQUE" | sed 's/^/    /g'
    echo
    echo "Sizes of these files:"

    if echo "$NODE_SCRATCHDIR"/* | grep -q "$NODE_SCRATCHDIR/\*$"; then
        # no files in scratchdir:
        du -shc * | sed 's/^/    /g'
    else
        du -shc * "$NODE_SCRATCHDIR"/* | sed 's/^/    /g'
    fi

    echo
    echo "If you want to delete these, run:"
    for node in $NODES_UNIQUE; do
        echo "    ssh $node rm -r \"$NODE_WORKDIR\" \"$NODE_SCRATCHDIR\""
    done
}

"#,
    "handle_error() {\n",
    "    echo\n",
    "    echo \"#######################################\"\n",
    "    echo \"#-- Early termination signal caught --#\"\n",
    "    echo \"#######################################\"\n",
    "    echo\n",
    "    error_hooks\n",
    "    stage_out\n",
    "}\n",
    "\n",
);

/// Runs the functions in order; the payload's return value becomes the exit code
pub const TRAILER: &str = r#"# Run the stuff:

print_info
stage_in

# If catch signals 2 9 15, run this function:
trap 'handle_error' 2 9 15

payload_hooks
stage_out
exit $RETURN_VALUE
"#;

/// Everything a job script is assembled from
#[derive(Debug, Clone)]
pub struct ScriptParts<'a> {
    pub header: &'a str,
    pub bindings: &'a EnvironmentBindings,
    pub calc: &'a CalculationEnvironment,
    /// Shell expression of the node working directory
    pub workdir: &'a str,
    /// Shell expression of the node scratch directory
    pub scratchdir: &'a str,
    pub payload: &'a str,
    pub error: &'a str,
}

/// Environment copy-in block, ending with the unique node list
pub fn environment_block(bindings: &EnvironmentBindings) -> String {
    let mut out = String::new();
    for (variable, source) in bindings.copy_in_order() {
        out.push_str(&format!("{}=${}\n", variable, source));
    }
    out.push_str("NODES_UNIQUE=$(echo \"$NODES\" | sort -u)\n");
    out
}

pub fn render(parts: &ScriptParts<'_>) -> String {
    let calc = parts.calc;
    let mut script = String::from(SHEBANG);
    script.push_str(parts.header);
    script.push('\n');
    script.push_str(SEPARATOR);

    script.push_str(&environment_block(parts.bindings));
    script.push_str(&format!("{}=0\n", calc.return_value));
    script.push_str(&format!("{}=\"{}\"\n", calc.node_work_dir, parts.workdir));
    script.push_str(&format!("{}=\"{}\"\n", calc.node_scratch_dir, parts.scratchdir));
    script.push_str(SEPARATOR);

    script.push_str(FUNCTIONS);
    script.push_str("payload_hooks() {\n:\n");
    script.push_str(parts.payload);
    script.push_str("}\n\n");
    script.push_str("error_hooks() {\n:\n");
    script.push_str(parts.error);
    script.push_str("}\n");
    script.push_str(SEPARATOR);

    script.push_str(TRAILER);
    script
}
